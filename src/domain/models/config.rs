use serde::{Deserialize, Serialize};

use super::tier::ModelTier;

/// Main configuration structure for redraft
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Request gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Tier to model name mapping
    #[serde(default)]
    pub models: ModelsConfig,

    /// Generative service provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Quality scorer configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Targeted reviser configuration
    #[serde(default)]
    pub revision: RevisionConfig,

    /// Convergence policy
    #[serde(default)]
    pub convergence: ConvergenceConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".redraft/redraft.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling JSON log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Rotation for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Also log to stderr when file logging is enabled
    #[serde(default = "default_true")]
    pub enable_stderr: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            enable_stderr: true,
        }
    }
}

/// Request gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GatewayConfig {
    /// Minimum delay between external dispatches in milliseconds (0 disables)
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Serve repeated prompts from the response cache
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Persist cache entries to the database and warm them on start-up
    #[serde(default = "default_true")]
    pub cache_persist: bool,

    /// Retry once on the next cheaper tier after exhausting retries
    #[serde(default)]
    pub tier_fallback: bool,
}

const fn default_min_interval_ms() -> u64 {
    3000
}

const fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            cache_enabled: true,
            cache_persist: true,
            tier_fallback: false,
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts per tier, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    2000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Model names served for each tier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelsConfig {
    #[serde(default = "default_fast_model")]
    pub fast: String,

    #[serde(default = "default_balanced_model")]
    pub balanced: String,

    #[serde(default = "default_complex_model")]
    pub complex: String,
}

fn default_fast_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_balanced_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_complex_model() -> String {
    "claude-opus-4-1".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            fast: default_fast_model(),
            balanced: default_balanced_model(),
            complex: default_complex_model(),
        }
    }
}

/// Generative service provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderConfig {
    /// Base URL for the Messages API (for testing/proxies)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Maximum tokens requested per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Quality scorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoringConfig {
    /// Upper bound on the serialised draft in a scoring prompt
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    #[serde(default = "default_scoring_tier")]
    pub tier: ModelTier,
}

const fn default_max_prompt_chars() -> usize {
    48_000
}

const fn default_scoring_tier() -> ModelTier {
    ModelTier::Balanced
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
            tier: default_scoring_tier(),
        }
    }
}

/// Targeted reviser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RevisionConfig {
    /// Dimensions scoring below this are repair targets
    #[serde(default = "default_repair_threshold")]
    pub repair_threshold: f64,

    #[serde(default = "default_repair_tier")]
    pub tier: ModelTier,

    /// Papers retrieved for coverage and citation repairs
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Section count for generated seed drafts
    #[serde(default = "default_seed_sections")]
    pub seed_sections: usize,
}

const fn default_repair_threshold() -> f64 {
    3.5
}

const fn default_repair_tier() -> ModelTier {
    ModelTier::Fast
}

const fn default_retrieval_k() -> usize {
    5
}

const fn default_seed_sections() -> usize {
    6
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            repair_threshold: default_repair_threshold(),
            tier: default_repair_tier(),
            retrieval_k: default_retrieval_k(),
            seed_sections: default_seed_sections(),
        }
    }
}

/// What to revise after a regression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionPolicy {
    /// Keep revising the regressed draft
    #[default]
    Continue,
    /// Revise from the best draft seen so far
    Rollback,
}

/// Convergence policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvergenceConfig {
    /// Overall score needed to converge
    #[serde(default = "default_convergence_threshold")]
    pub threshold: f64,

    /// Highest iteration index; scoring runs at most `iteration_cap + 1` times
    #[serde(default = "default_iteration_cap")]
    pub iteration_cap: u32,

    /// Consecutive passing iterations required to converge
    #[serde(default = "default_stable_iterations")]
    pub stable_iterations: u32,

    #[serde(default)]
    pub regression_policy: RegressionPolicy,
}

const fn default_convergence_threshold() -> f64 {
    4.0
}

const fn default_iteration_cap() -> u32 {
    5
}

const fn default_stable_iterations() -> u32 {
    1
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            threshold: default_convergence_threshold(),
            iteration_cap: default_iteration_cap(),
            stable_iterations: default_stable_iterations(),
            regression_policy: RegressionPolicy::default(),
        }
    }
}
