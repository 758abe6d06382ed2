//! Adapters for external systems: generative services, retrieval, storage.

pub mod generators;
pub mod memory;
pub mod retrieval;
pub mod sqlite;
