//! In-memory stores for tests and `--no-persist` runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RunState;
use crate::domain::ports::{CacheEntry, CacheStore, CheckpointStore};

/// Checkpoint store backed by a map, with optional failure injection.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    states: Arc<RwLock<HashMap<String, RunState>>>,
    saves: AtomicUsize,
    fail_after: Option<usize>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves start failing once `saves` have succeeded.
    pub fn failing_after(saves: usize) -> Self {
        Self {
            fail_after: Some(saves),
            ..Self::default()
        }
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, state: &RunState) -> DomainResult<()> {
        if let Some(limit) = self.fail_after {
            if self.saves.load(Ordering::SeqCst) >= limit {
                return Err(DomainError::Storage("checkpoint store unavailable".to_string()));
            }
        }
        self.states
            .write()
            .await
            .insert(state.run_id.clone(), state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, run_id: &str) -> DomainResult<Option<RunState>> {
        Ok(self.states.read().await.get(run_id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<RunState>> {
        let mut states: Vec<RunState> = self.states.read().await.values().cloned().collect();
        states.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        states.truncate(limit);
        Ok(states)
    }
}

/// Cache store that only lives as long as the process.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn load_all(&self) -> DomainResult<Vec<(String, CacheEntry)>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> DomainResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), entry.clone());
        Ok(())
    }
}
