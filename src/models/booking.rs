use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body measurements in centimetres. Unset values are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Measurements {
    #[garde(range(min = 0.0, max = 500.0))]
    pub height: f64,

    #[garde(range(min = 0.0, max = 500.0))]
    pub chest: f64,

    #[garde(range(min = 0.0, max = 500.0))]
    pub waist: f64,

    #[garde(range(min = 0.0, max = 500.0))]
    pub hips: f64,

    #[garde(range(min = 0.0, max = 500.0))]
    pub inseam: f64,
}

/// In-progress booking form for one tailor, saved on every field change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingDraft {
    pub garment_type: String,
    pub fabric_type: String,
    pub notes: String,
    pub measurements: Measurements,
    /// Current step of the multi-step form.
    pub step: u8,
}

/// Response when restoring a draft.
#[derive(Debug, Serialize)]
pub struct BookingDraftResponse {
    pub tailor_id: Uuid,
    pub restored: bool,
    pub draft: BookingDraft,
}

/// Submitted booking.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookingRequest {
    #[garde(length(min = 1, max = 100))]
    pub garment_type: String,

    #[garde(length(max = 100))]
    #[serde(default)]
    pub fabric_type: Option<String>,

    #[garde(length(max = 2000))]
    #[serde(default)]
    pub notes: Option<String>,

    #[garde(dive)]
    #[serde(default)]
    pub measurements: Measurements,

    #[garde(length(max = 2048))]
    #[serde(default)]
    pub tryon_image_url: Option<String>,
}

impl BookingRequest {
    /// Trim free-text fields, dropping ones left empty.
    pub fn normalized(mut self) -> Self {
        self.garment_type = self.garment_type.trim().to_string();
        self.fabric_type = non_blank(self.fabric_type);
        self.notes = non_blank(self.notes);
        self.tryon_image_url = non_blank(self.tryon_image_url);
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Row values for a new order and its single item.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub tailor_id: Uuid,
    pub garment_type: String,
    pub fabric_type: Option<String>,
    pub notes: Option<String>,
    pub measurements: Measurements,
    pub tryon_image_url: Option<String>,
}

impl NewOrder {
    pub fn from_request(customer_id: Uuid, tailor_id: Uuid, request: BookingRequest) -> Self {
        Self {
            customer_id,
            tailor_id,
            garment_type: request.garment_type,
            fabric_type: request.fabric_type,
            notes: request.notes,
            measurements: request.measurements,
            tryon_image_url: request.tryon_image_url,
        }
    }
}

/// Response after a booking is created.
#[derive(Debug, Serialize)]
pub struct BookingCreated {
    pub order_id: Uuid,
    pub status: String,
}
