use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::profiles::ProfileLoader;
use crate::auth::session::SessionVerifier;
use crate::db::orders::OrderRepository;
use crate::services::drafts::DraftStore;
use crate::services::tryon::TryOnTracker;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub sessions: Arc<SessionVerifier>,
    pub profiles: Arc<ProfileLoader>,
    pub orders: Arc<dyn OrderRepository>,
    pub drafts: Arc<dyn DraftStore>,
    pub tryon: Arc<TryOnTracker>,
    pub max_upload_bytes: usize,
}
