use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::auth::profiles::ProfileError;
use crate::services::drafts::DraftError;
use crate::services::tryon::TryOnError;

/// Errors surfaced by HTTP handlers, rendered as `{"error", "code"}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    TryOn(#[from] TryOnError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(report.to_string().trim_end().to_string())
    }
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        AppError::Internal(format!("Draft store: {err}"))
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Missing(_) => {
                AppError::Forbidden("No profile exists for this account".to_string())
            }
            ProfileError::Lookup(e) | ProfileError::Repair(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::AuthenticationRequired(msg) => {
                (StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED", msg.clone())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::TryOn(err) => {
                tracing::warn!(error = %err, "Try-on request failed");
                let (status, code) = match err {
                    TryOnError::Upload(_) => (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED"),
                    TryOnError::ServiceUnavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
                    }
                    TryOnError::GenerationFailed(_) => (StatusCode::BAD_GATEWAY, "GENERATION_FAILED"),
                    TryOnError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
                    TryOnError::Cancelled => (StatusCode::CONFLICT, "CANCELLED"),
                };
                (status, code, err.user_message())
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
