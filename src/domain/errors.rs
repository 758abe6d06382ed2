//! Domain errors for the redraft revision engine.

use thiserror::Error;

use super::models::{Dimension, ModelTier};

/// Domain-level errors raised by stores, adapters, and validation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

/// Errors reported by a generative text service adapter for a single attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The service rejected the call because of rate limiting (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The attempt did not complete within the configured timeout
    #[error("Timeout waiting for response")]
    Timeout,

    /// Server-side failure (HTTP 5xx, 529 overloaded)
    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The request itself is invalid (HTTP 400, 404)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or rejected credentials (HTTP 401, 403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The service answered but produced no text
    #[error("Empty response")]
    EmptyResponse,
}

impl GenerationError {
    /// Returns true if this error is transient and the attempt may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited
                | GenerationError::Timeout
                | GenerationError::Server(_, _)
                | GenerationError::Network(_)
        )
    }

    /// Map an HTTP status and body to an error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 | 404 | 413 | 422 => GenerationError::InvalidRequest(body),
            401 | 403 => GenerationError::Authentication(body),
            429 => GenerationError::RateLimited,
            500..=599 => GenerationError::Server(status, body),
            _ => GenerationError::Server(status, format!("unexpected status: {body}")),
        }
    }
}

/// Errors surfaced by the request gateway to scorer, reviser, and seed writer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The service could not produce a response after retries (or failed permanently)
    #[error("Generative service unavailable on {tier} tier after {attempts} attempt(s): {reason}")]
    Unavailable {
        tier: ModelTier,
        attempts: u32,
        reason: String,
    },

    /// A response was received but cannot be used
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Failure to decode a structured verdict from service output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerdictParseError {
    #[error("response contains no JSON object")]
    NoJsonObject,

    #[error("invalid verdict JSON: {0}")]
    InvalidJson(String),

    #[error("missing score for dimension {0}")]
    MissingScore(Dimension),

    #[error("score for dimension {0} is not a finite number")]
    NonFiniteScore(Dimension),
}

/// Fatal failures of a convergence run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Checkpoint storage failed; the run is in the FAILED state.
    #[error(
        "checkpoint storage failed for run {run_id} (last checkpointed iteration: {}): {source}",
        .last_checkpointed_iteration.map_or_else(|| "none".to_string(), |i| i.to_string())
    )]
    Storage {
        run_id: String,
        last_checkpointed_iteration: Option<u32>,
        #[source]
        source: DomainError,
    },

    /// No checkpoint exists for the requested run.
    #[error("Run not found: {0}")]
    NotFound(String),
}
