//! Response cache persistence port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::ModelTier;

/// A cached successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub response: String,
    /// Tier that actually served the response.
    pub tier: ModelTier,
    pub created_at: DateTime<Utc>,
}

/// Optional backing store for the gateway's response cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// All persisted entries, used to warm the cache on start-up.
    async fn load_all(&self) -> DomainResult<Vec<(String, CacheEntry)>>;

    /// Insert or replace an entry (last writer wins).
    async fn put(&self, key: &str, entry: &CacheEntry) -> DomainResult<()>;
}
