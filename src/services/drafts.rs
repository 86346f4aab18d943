use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::booking::BookingDraft;

const KEY_PREFIX: &str = "booking_draft";

/// Identifies one draft: a customer's booking form for one tailor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftScope {
    pub owner: Uuid,
    pub tailor_id: Uuid,
}

impl DraftScope {
    pub fn new(owner: Uuid, tailor_id: Uuid) -> Self {
        Self { owner, tailor_id }
    }

    pub fn key(&self) -> String {
        format!("{KEY_PREFIX}:{}:{}", self.owner, self.tailor_id)
    }
}

/// Key-value persistence for booking drafts. Values are stored as JSON
/// strings so every backend sees the same representation.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn read_raw(&self, key: &str) -> Result<Option<String>, DraftError>;
    async fn write_raw(&self, key: &str, value: String) -> Result<(), DraftError>;
    async fn remove(&self, key: &str) -> Result<(), DraftError>;

    /// Check backend connectivity (for health checks).
    async fn health_check(&self) -> Result<(), DraftError> {
        Ok(())
    }
}

/// Save the full form state, replacing any previous draft for the scope.
pub async fn save_draft(
    store: &dyn DraftStore,
    scope: &DraftScope,
    draft: &BookingDraft,
) -> Result<(), DraftError> {
    let payload = serde_json::to_string(draft).map_err(DraftError::Serialize)?;
    store.write_raw(&scope.key(), payload).await
}

/// Restore the draft for a scope. Stored data that no longer decodes is
/// reported as absent so the form starts fresh.
pub async fn load_draft(
    store: &dyn DraftStore,
    scope: &DraftScope,
) -> Result<Option<BookingDraft>, DraftError> {
    let key = scope.key();
    let Some(payload) = store.read_raw(&key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&payload) {
        Ok(draft) => Ok(Some(draft)),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Discarding undecodable booking draft");
            Ok(None)
        }
    }
}

pub async fn delete_draft(store: &dyn DraftStore, scope: &DraftScope) -> Result<(), DraftError> {
    store.remove(&scope.key()).await
}

/// Redis-backed draft store.
pub struct RedisDraftStore {
    client: redis::Client,
}

impl RedisDraftStore {
    pub fn new(redis_url: &str) -> Result<Self, DraftError> {
        let client = redis::Client::open(redis_url).map_err(DraftError::Redis)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, DraftError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl DraftStore for RedisDraftStore {
    async fn read_raw(&self, key: &str) -> Result<Option<String>, DraftError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await.map_err(DraftError::Redis)?;
        Ok(value)
    }

    async fn write_raw(&self, key: &str, value: String) -> Result<(), DraftError> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(DraftError::Redis)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DraftError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key).await.map_err(DraftError::Redis)?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DraftError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(DraftError::Redis)?;
        Ok(())
    }
}

/// In-process draft store, used when no Redis URL is configured.
#[derive(Default)]
pub struct MemoryDraftStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn read_raw(&self, key: &str) -> Result<Option<String>, DraftError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write_raw(&self, key: &str, value: String) -> Result<(), DraftError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DraftError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
