//! `AppError` to HTTP response mapping, checked on the rendered JSON body.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;

use tailor_market::error::AppError;
use tailor_market::services::generation::GenerationError;
use tailor_market::services::storage::StorageError;
use tailor_market::services::tryon::TryOnError;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn upload_failure_returns_502() {
    let (status, json) =
        error_to_response(TryOnError::Upload(StorageError::Rejected(403)).into()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "UPLOAD_FAILED");
    assert_eq!(json["error"], "Failed to upload image");
}

#[tokio::test]
async fn remote_api_error_returns_503() {
    let err = TryOnError::ServiceUnavailable(GenerationError::Api {
        status: 500,
        detail: "boom".to_string(),
    });

    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn generation_failure_carries_remote_detail() {
    let err = TryOnError::GenerationFailed(Some("NSFW content detected".to_string()));

    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "GENERATION_FAILED");
    assert_eq!(json["error"], "Try-on generation failed: NSFW content detected");
}

#[tokio::test]
async fn timeout_returns_504() {
    let (status, json) =
        error_to_response(TryOnError::Timeout(Duration::from_secs(60)).into()).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["error"], "Try-on generation timed out");
}

#[tokio::test]
async fn internal_errors_are_sanitised() {
    let (status, json) =
        error_to_response(AppError::Internal("redis password wrong".into())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}
