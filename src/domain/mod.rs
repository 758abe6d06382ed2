//! Domain layer for the redraft revision engine
//!
//! Core models, error types, and the ports that adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, GatewayError, GenerationError, RunError, VerdictParseError};
