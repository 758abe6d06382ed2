//! Generative text service port.

use async_trait::async_trait;

use crate::domain::errors::GenerationError;
use crate::domain::models::ModelTier;

/// A single generation call against a concrete model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub tier: ModelTier,
    /// Model name resolved from the tier.
    pub model: String,
    pub max_tokens: u32,
}

/// The external generative text service.
///
/// One call is one attempt: retries, caching and rate limiting live in the
/// request gateway, not in implementations of this trait.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Adapter name for logs.
    fn name(&self) -> &'static str;
}
