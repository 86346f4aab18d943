use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for booking drafts. Drafts are kept in
    /// process memory when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// HS256 secret the auth provider signs access tokens with
    pub jwt_secret: String,

    /// R2 bucket name
    pub r2_bucket: String,

    /// R2 access key ID (S3-compatible)
    pub r2_access_key: String,

    /// R2 secret access key (S3-compatible)
    pub r2_secret_key: String,

    /// R2 endpoint URL
    pub r2_endpoint: String,

    /// Public base URL objects are served from
    pub r2_public_url: String,

    /// Image generation API key. Try-on is reported as unavailable without it.
    #[serde(default)]
    pub ai_api_key: Option<String>,

    #[serde(default = "default_ai_api_url")]
    pub ai_api_url: String,

    #[serde(default = "default_ai_model_version")]
    pub ai_model_version: String,

    #[serde(default = "default_poll_interval_secs")]
    pub try_on_poll_interval_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub try_on_timeout_secs: u64,

    /// Upper bound for multipart request bodies
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_ai_api_url() -> String {
    "https://api.replicate.com/v1".to_string()
}

fn default_ai_model_version() -> String {
    "c871e91cab9694f69950995c34526801332a2b4070d690a618f3e5559d454746".to_string()
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Parse and check configuration from `(NAME, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), envy::Error> {
        if self.try_on_poll_interval_secs == 0 {
            return Err(envy::Error::Custom(
                "TRY_ON_POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.try_on_timeout_secs == 0 {
            return Err(envy::Error::Custom(
                "TRY_ON_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn try_on_poll_interval(&self) -> Duration {
        Duration::from_secs(self.try_on_poll_interval_secs)
    }

    pub fn try_on_timeout(&self) -> Duration {
        Duration::from_secs(self.try_on_timeout_secs)
    }
}
