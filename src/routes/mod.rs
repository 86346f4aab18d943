use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

pub mod bookings;
pub mod health;
pub mod metrics;
pub mod tryon;

/// Application routes without the metrics endpoint or HTTP middleware.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/customer/try-on", post(tryon::submit_try_on))
        .route(
            "/api/v1/customer/try-on/{id}",
            get(tryon::get_try_on).delete(tryon::cancel_try_on),
        )
        .route(
            "/api/v1/customer/drafts/{tailor_id}",
            get(bookings::get_draft)
                .put(bookings::save_draft)
                .delete(bookings::discard_draft),
        )
        .route(
            "/api/v1/customer/bookings/{tailor_id}",
            post(bookings::submit_booking),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
