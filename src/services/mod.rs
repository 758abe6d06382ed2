//! Engine services: the request gateway and everything that runs on it.

pub mod baseline;
pub mod controller;
pub mod gateway;
pub mod model_router;
pub mod prompts;
pub mod reviser;
pub mod scorer;
pub mod seed_writer;
pub mod truncation;
pub mod verdict_parser;

pub use baseline::BaselineReviser;
pub use controller::{ConvergenceController, RunHandle};
pub use gateway::RequestGateway;
pub use model_router::TierRouter;
pub use reviser::TargetedReviser;
pub use scorer::QualityScorer;
pub use seed_writer::SeedWriter;
