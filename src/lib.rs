//! Redraft - convergence-driven survey revision
//!
//! Redraft improves a generated survey draft by repeatedly scoring it along
//! five quality dimensions, revising only the weakest ones, and re-scoring
//! until the overall score crosses a threshold or an iteration cap is hit.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): gateway, scorer, revisers and the convergence controller
//! - **Adapters** (`adapters`): generative service, retrieval and storage implementations
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use redraft::adapters::generators::ScriptedGenerator;
//! use redraft::adapters::memory::InMemoryCheckpointStore;
//! use redraft::adapters::retrieval::KeywordCorpus;
//! use redraft::{Config, ConvergenceController, RequestGateway, RunHandle};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let gateway = Arc::new(RequestGateway::new(Arc::new(ScriptedGenerator::dry_run())));
//!     let controller = ConvergenceController::new(
//!         &config,
//!         gateway,
//!         Arc::new(KeywordCorpus::empty()),
//!         Arc::new(InMemoryCheckpointStore::new()),
//!     );
//!     let report = controller.run("graph neural networks", None, None, &RunHandle::new()).await?;
//!     println!("{}", report.final_draft.to_markdown());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, GatewayError, GenerationError, RunError};
pub use domain::models::{
    Config, Dimension, Draft, ModelTier, Paper, RunReport, Section, Termination, Verdict,
};
pub use domain::ports::{CacheStore, CheckpointStore, PaperRetriever, TextGenerator};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    BaselineReviser, ConvergenceController, QualityScorer, RequestGateway, RunHandle,
    TargetedReviser,
};
