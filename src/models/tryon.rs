use std::str::FromStr;

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use strum::EnumString;
use uuid::Uuid;

/// An uploaded photo, checked to be a decodable image format.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ImagePayload {
    /// Accept `bytes` as an image. `declared_type` is the MIME type the
    /// client sent, if any; it must be an `image/*` type when present.
    pub fn new(bytes: Vec<u8>, declared_type: Option<&str>) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        if let Some(declared) = declared_type {
            if !declared.starts_with("image/") {
                return Err(ImageError::NotAnImage(declared.to_string()));
            }
        }

        let format = image::guess_format(&bytes)
            .map_err(|_| ImageError::UnsupportedFormat)?;

        Ok(Self { bytes, format })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ImageError {
    #[error("Image is empty")]
    Empty,

    #[error("Expected an image upload, got {0}")]
    NotAnImage(String),

    #[error("Unsupported image format (PNG, JPG or WebP expected)")]
    UnsupportedFormat,
}

/// A user's request to see a garment on themselves.
#[derive(Debug, Clone)]
pub struct TryOnRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: ImagePayload,
    pub garment: ImagePayload,
    pub garment_description: String,
}

impl TryOnRequest {
    pub fn new(
        user_id: Uuid,
        subject: ImagePayload,
        garment: ImagePayload,
        garment_description: &str,
    ) -> Result<Self, TryOnRequestError> {
        let garment_description = garment_description.trim();
        if garment_description.is_empty() {
            return Err(TryOnRequestError::MissingGarmentDescription);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            subject,
            garment,
            garment_description: garment_description.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TryOnRequestError {
    #[error("Garment type is required")]
    MissingGarmentDescription,
}

/// Remote generation status. Anything the service reports besides the
/// known values is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    #[strum(default)]
    Other(String),
}

impl JobStatus {
    /// Only `succeeded` and `failed` end a job; `canceled` and unknown
    /// values keep the poller waiting until its deadline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        JobStatus::from_str(&raw).unwrap_or(JobStatus::Other(raw))
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl Serialize for JobStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(JobStatus::from)
    }
}

/// Generation output: some models return one URL, others a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    Single(String),
    Many(Vec<String>),
}

impl JobOutput {
    pub fn first(&self) -> Option<&str> {
        match self {
            JobOutput::Single(url) => Some(url.as_str()),
            JobOutput::Many(urls) => urls.first().map(String::as_str),
        }
        .filter(|url| !url.is_empty())
    }
}

/// Read-only mirror of a remote generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryOnJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub output: Option<JobOutput>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TryOnJob {
    /// The image to show, once the job has succeeded with an output.
    pub fn result_url(&self) -> Option<&str> {
        if self.status != JobStatus::Succeeded {
            return None;
        }
        self.output.as_ref().and_then(JobOutput::first)
    }
}

/// Tracked state of a try-on, as reported to the customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TryOnState {
    Pending { remote_status: String },
    Succeeded { image_url: String },
    Failed { code: &'static str, message: String },
}

impl TryOnState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TryOnState::Pending { .. })
    }
}

/// Response after submitting a try-on.
#[derive(Debug, Serialize)]
pub struct TryOnSubmitted {
    pub id: Uuid,
    pub job_id: String,
    pub status: JobStatus,
}

/// Response for querying a tracked try-on.
#[derive(Debug, Serialize)]
pub struct TryOnStatusResponse {
    pub id: Uuid,
    pub job_id: String,
    #[serde(flatten)]
    pub state: TryOnState,
}
