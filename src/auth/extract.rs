//! Axum extractors for authenticated requests.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::auth::session::Session;
use crate::error::AppError;
use crate::models::profile::{Profile, UserRole};

/// A request carrying a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::AuthenticationRequired("Not authenticated".into()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::AuthenticationRequired("Expected: Bearer <token>".into())
        })?;

        let session = state.sessions.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::AuthenticationRequired("Invalid or expired session".into())
        })?;

        Ok(AuthSession(session))
    }
}

/// An authenticated customer. Tailors and admins are rejected with 403.
#[derive(Debug, Clone)]
pub struct CustomerSession {
    pub session: Session,
    pub profile: Profile,
}

impl CustomerSession {
    pub fn user_id(&self) -> uuid::Uuid {
        self.session.user_id
    }
}

impl FromRequestParts<AppState> for CustomerSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthSession(session) = AuthSession::from_request_parts(parts, state).await?;
        let profile = state.profiles.load(&session).await?;

        if profile.role != UserRole::Customer {
            return Err(AppError::Forbidden(format!(
                "Customer role required (signed in as {})",
                profile.role
            )));
        }

        Ok(CustomerSession { session, profile })
    }
}
