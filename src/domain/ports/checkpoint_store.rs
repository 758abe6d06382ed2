//! Run checkpoint persistence port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::RunState;

/// Durable storage for run state.
///
/// Implementations must round-trip the draft and iteration trace exactly.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist or replace the checkpoint for `state.run_id`.
    async fn save(&self, state: &RunState) -> DomainResult<()>;

    async fn load(&self, run_id: &str) -> DomainResult<Option<RunState>>;

    /// Most recently updated runs first.
    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<RunState>>;
}
