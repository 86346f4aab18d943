use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::extract::CustomerSession;
use crate::error::{AppError, AppResult};
use crate::models::booking::{
    BookingCreated, BookingDraft, BookingDraftResponse, BookingRequest, NewOrder,
};
use crate::routes::metrics as metric_names;
use crate::services::drafts::{self, DraftScope};

/// GET /api/v1/customer/drafts/{tailor_id}
pub async fn get_draft(
    State(state): State<AppState>,
    customer: CustomerSession,
    Path(tailor_id): Path<Uuid>,
) -> AppResult<Json<BookingDraftResponse>> {
    let scope = DraftScope::new(customer.user_id(), tailor_id);
    let stored = drafts::load_draft(state.drafts.as_ref(), &scope).await?;

    Ok(Json(BookingDraftResponse {
        tailor_id,
        restored: stored.is_some(),
        draft: stored.unwrap_or_default(),
    }))
}

/// PUT /api/v1/customer/drafts/{tailor_id} — autosave the whole form.
pub async fn save_draft(
    State(state): State<AppState>,
    customer: CustomerSession,
    Path(tailor_id): Path<Uuid>,
    Json(draft): Json<BookingDraft>,
) -> AppResult<StatusCode> {
    let scope = DraftScope::new(customer.user_id(), tailor_id);
    drafts::save_draft(state.drafts.as_ref(), &scope, &draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/customer/drafts/{tailor_id}
pub async fn discard_draft(
    State(state): State<AppState>,
    customer: CustomerSession,
    Path(tailor_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let scope = DraftScope::new(customer.user_id(), tailor_id);
    drafts::delete_draft(state.drafts.as_ref(), &scope).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/customer/bookings/{tailor_id} — place the order and drop
/// the saved draft.
pub async fn submit_booking(
    State(state): State<AppState>,
    customer: CustomerSession,
    Path(tailor_id): Path<Uuid>,
    Json(request): Json<BookingRequest>,
) -> AppResult<(StatusCode, Json<BookingCreated>)> {
    let request = request.normalized();
    if request.garment_type.is_empty() {
        return Err(AppError::Validation("Select a garment type".into()));
    }
    request.validate()?;

    if !state.orders.tailor_exists(tailor_id).await? {
        return Err(AppError::NotFound(format!("Tailor {tailor_id} not found")));
    }

    let customer_id = customer.user_id();
    let order = NewOrder::from_request(customer_id, tailor_id, request);
    let order_id = state.orders.create_order(&order).await?;
    metrics::counter!(metric_names::BOOKINGS_CREATED).increment(1);

    let scope = DraftScope::new(customer_id, tailor_id);
    if let Err(e) = drafts::delete_draft(state.drafts.as_ref(), &scope).await {
        tracing::warn!(order_id = %order_id, error = %e, "Failed to delete booking draft");
    }

    Ok((
        StatusCode::CREATED,
        Json(BookingCreated {
            order_id,
            status: "pending".to_string(),
        }),
    ))
}
