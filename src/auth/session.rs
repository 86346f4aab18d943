//! Bearer-token sessions issued by the hosted auth provider.
//!
//! Access tokens are HS256 JWTs with audience `authenticated`. Sign-up
//! metadata (full name and requested role) rides along in `user_metadata`
//! and is what the profile repair step falls back on.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::profile::UserRole;

const AUDIENCE: &str = "authenticated";

/// Metadata supplied at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    /// Unrecognised roles read as `None`.
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<UserRole>,
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<UserRole>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|role| UserRole::from_str(role).ok()))
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    pub aud: String,
    pub exp: i64,
}

/// A verified session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub metadata: UserMetadata,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Display name from metadata, falling back to the email's local part.
    pub fn display_name(&self) -> String {
        self.metadata
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
                    .map(str::to_string)
            })
            .unwrap_or_default()
    }
}

/// Verifies access tokens against the provider's signing secret.
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Session, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(AuthError::InvalidToken)?;
        let claims = data.claims;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AuthError::MalformedExpiry)?;

        Ok(Session {
            user_id: claims.sub,
            email: claims.email,
            metadata: claims.user_metadata,
            expires_at,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid or expired token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Token expiry out of range")]
    MalformedExpiry,
}
