use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::extract::CustomerSession;
use crate::error::{AppError, AppResult};
use crate::models::tryon::{ImagePayload, TryOnRequest, TryOnStatusResponse, TryOnSubmitted};

/// POST /api/v1/customer/try-on — upload a photo and a garment and start
/// generation. Poll the returned id for the result.
pub async fn submit_try_on(
    State(state): State<AppState>,
    customer: CustomerSession,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<TryOnSubmitted>)> {
    let mut user_image: Option<ImagePayload> = None;
    let mut garment_image: Option<ImagePayload> = None;
    let mut garment_type = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);

        match name.as_str() {
            "user_image" | "garment_image" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
                let payload = ImagePayload::new(data.to_vec(), content_type.as_deref())
                    .map_err(|e| AppError::Validation(format!("{name}: {e}")))?;

                if name == "user_image" {
                    user_image = Some(payload);
                } else {
                    garment_image = Some(payload);
                }
            }
            "garment_type" => {
                garment_type = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let subject = user_image
        .ok_or_else(|| AppError::Validation("Upload a photo of yourself".into()))?;
    let garment = garment_image
        .ok_or_else(|| AppError::Validation("Upload a garment image".into()))?;

    let request = TryOnRequest::new(customer.user_id(), subject, garment, &garment_type)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let tracked = state.tryon.start(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TryOnSubmitted {
            id: tracked.id,
            job_id: tracked.job_id,
            status: tracked.status,
        }),
    ))
}

/// GET /api/v1/customer/try-on/{id} — current state of a try-on.
pub async fn get_try_on(
    State(state): State<AppState>,
    customer: CustomerSession,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TryOnStatusResponse>> {
    let snapshot = state
        .tryon
        .get(customer.user_id(), id)
        .ok_or_else(|| AppError::NotFound(format!("Try-on {id} not found")))?;

    Ok(Json(TryOnStatusResponse {
        id,
        job_id: snapshot.job_id,
        state: snapshot.state,
    }))
}

/// DELETE /api/v1/customer/try-on/{id} — stop polling and discard.
pub async fn cancel_try_on(
    State(state): State<AppState>,
    customer: CustomerSession,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.tryon.cancel(customer.user_id(), id) {
        tracing::info!(request_id = %id, "Try-on cancelled by customer");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Try-on {id} not found")))
    }
}
