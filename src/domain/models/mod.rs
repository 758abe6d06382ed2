pub mod config;
pub mod draft;
pub mod paper;
pub mod run;
pub mod tier;
pub mod usage;
pub mod verdict;

pub use config::{
    Config, ConvergenceConfig, DatabaseConfig, GatewayConfig, LoggingConfig, ModelsConfig,
    ProviderConfig, RegressionPolicy, RetryConfig, RevisionConfig, ScoringConfig,
};
pub use draft::{
    extract_citations, CitationMarker, Draft, Provenance, RevisionNote, RevisionOutcome, Section,
};
pub use paper::Paper;
pub use run::{BestDraft, IterationRecord, RunPhase, RunReport, RunState, Termination};
pub use tier::ModelTier;
pub use usage::{TierUsage, UsageSnapshot};
pub use verdict::{
    clamp_score, Dimension, DimensionScores, Verdict, VerdictProvenance, DEGRADED_ISSUE,
    DEGRADED_SCORE, MAX_SCORE, MIN_SCORE,
};
