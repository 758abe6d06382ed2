//! Lexical paper retrieval port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Paper;

/// Ranked search over an ingested paper corpus.
#[async_trait]
pub trait PaperRetriever: Send + Sync {
    /// Return up to `k` papers ranked by relevance to `query`.
    async fn search(&self, query: &str, k: usize) -> DomainResult<Vec<Paper>>;
}
