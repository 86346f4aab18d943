use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::tryon::TryOnJob;

/// Inputs of a virtual try-on generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationInput {
    pub human_img: String,
    pub garm_img: String,
    pub garment_des: String,
}

/// Remote image-generation service running try-on jobs.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Start a job, returning its id and initial status.
    async fn create_job(&self, input: &GenerationInput) -> Result<TryOnJob, GenerationError>;

    /// Fetch the current status of a job.
    async fn get_job(&self, job_id: &str) -> Result<TryOnJob, GenerationError>;
}

/// Client for a Replicate-style predictions API.
pub struct ReplicateClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
    model_version: String,
}

#[derive(Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: &'a GenerationInput,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

impl ReplicateClient {
    pub fn new(base_url: &str, api_token: Option<String>, model_version: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            model_version: model_version.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    fn token(&self) -> Result<&str, GenerationError> {
        self.api_token.as_deref().ok_or(GenerationError::NotConfigured)
    }

    async fn parse_job(response: reqwest::Response) -> Result<TryOnJob, GenerationError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or(body);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        response.json::<TryOnJob>().await.map_err(GenerationError::Http)
    }
}

#[async_trait]
impl GenerationApi for ReplicateClient {
    async fn create_job(&self, input: &GenerationInput) -> Result<TryOnJob, GenerationError> {
        let token = self.token()?;

        let response = self
            .http
            .post(format!("{}/predictions", self.base_url))
            .header(reqwest::header::AUTHORIZATION, format!("Token {token}"))
            .json(&PredictionRequest {
                version: &self.model_version,
                input,
            })
            .send()
            .await
            .map_err(GenerationError::Http)?;

        let job = Self::parse_job(response).await?;
        tracing::info!(job_id = %job.id, status = job.status.as_str(), "Generation job created");
        Ok(job)
    }

    async fn get_job(&self, job_id: &str) -> Result<TryOnJob, GenerationError> {
        let token = self.token()?;

        let response = self
            .http
            .get(format!("{}/predictions/{}", self.base_url, job_id))
            .header(reqwest::header::AUTHORIZATION, format!("Token {token}"))
            .send()
            .await
            .map_err(GenerationError::Http)?;

        Self::parse_job(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("AI service not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service error ({status}): {detail}")]
    Api { status: u16, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_not_configured() {
        let client = ReplicateClient::new("https://api.replicate.com/v1/", None, "v1");
        assert!(!client.is_configured());

        let err = client.get_job("abc").await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured));
    }

    #[tokio::test]
    async fn test_blank_token_is_not_configured() {
        let client = ReplicateClient::new("https://api.replicate.com/v1", Some("  ".into()), "v1");
        let input = GenerationInput {
            human_img: "https://cdn/a.png".into(),
            garm_img: "https://cdn/b.png".into(),
            garment_des: "Shirt".into(),
        };
        let err = client.create_job(&input).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured));
    }

    #[test]
    fn test_prediction_request_shape() {
        let input = GenerationInput {
            human_img: "https://cdn/a.png".into(),
            garm_img: "https://cdn/b.png".into(),
            garment_des: "Blazer".into(),
        };
        let body = serde_json::to_value(PredictionRequest {
            version: "abc123",
            input: &input,
        })
        .unwrap();

        assert_eq!(body["version"], "abc123");
        assert_eq!(body["input"]["human_img"], "https://cdn/a.png");
        assert_eq!(body["input"]["garm_img"], "https://cdn/b.png");
        assert_eq!(body["input"]["garment_des"], "Blazer");
    }
}
