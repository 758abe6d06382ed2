//! Content-addressed response cache.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::ModelTier;
use crate::domain::ports::{CacheEntry, CacheStore};

/// Hex SHA-256 of `(tier, prompt)`.
pub fn cache_key(tier: ModelTier, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tier.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory cache of successful responses with optional write-through persistence.
///
/// Entries are never invalidated; concurrent writers to one key resolve as
/// last-writer-wins.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    store: Option<Arc<dyn CacheStore>>,
}

impl ResponseCache {
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store: None,
        }
    }

    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store: Some(store),
        }
    }

    /// Load persisted entries into memory. Returns the number loaded.
    pub async fn warm(&self) -> DomainResult<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let persisted = store.load_all().await?;
        let count = persisted.len();
        let mut entries = self.entries.write().await;
        entries.extend(persisted);
        debug!(entries = count, "response cache warmed");
        Ok(count)
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Insert a successful response. Persistence failures are logged, not raised.
    pub async fn put(&self, key: String, tier: ModelTier, response: String) {
        let entry = CacheEntry {
            response,
            tier,
            created_at: Utc::now(),
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.put(&key, &entry).await {
                warn!(error = %e, "failed to persist cache entry");
            }
        }

        self.entries.write().await.insert(key, entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
