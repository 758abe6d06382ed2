//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - TextGenerator: the external generative text service
//! - PaperRetriever: lexical search over a paper corpus
//! - CheckpointStore: run state persistence
//! - CacheStore: response cache persistence

pub mod cache_store;
pub mod checkpoint_store;
pub mod generator;
pub mod retriever;

pub use cache_store::{CacheEntry, CacheStore};
pub use checkpoint_store::CheckpointStore;
pub use generator::{GenerationRequest, TextGenerator};
pub use retriever::PaperRetriever;
