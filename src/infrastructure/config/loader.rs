use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::{MAX_SCORE, MIN_SCORE};

/// Smallest scoring prompt budget that still fits one section and the rubric
pub const MIN_PROMPT_CHARS: usize = 1000;

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid max_attempts: 0. At least one attempt is required")]
    InvalidMaxAttempts,

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid request_timeout_secs: 0. Must be at least 1")]
    InvalidRequestTimeout,

    #[error("Invalid {name}: {value}. Must be between 1.0 and 5.0")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("Invalid iteration_cap: 0. Must be at least 1")]
    InvalidIterationCap,

    #[error("Invalid stable_iterations: 0. Must be at least 1")]
    InvalidStableIterations,

    #[error("Invalid max_prompt_chars: {0}. Must be at least {MIN_PROMPT_CHARS}")]
    PromptBudgetTooSmall(usize),

    #[error("Model name for tier {0} cannot be empty")]
    EmptyModelName(&'static str),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .redraft/config.yaml (project config)
    /// 3. .redraft/local.yaml (local overrides, optional)
    /// 4. Environment variables (REDRAFT_* prefix, `__` between sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".redraft/config.yaml"))
            .merge(Yaml::file(".redraft/local.yaml"))
            .merge(Env::prefixed("REDRAFT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; environment variables still win.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("REDRAFT_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(0));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        if !["json", "pretty"].contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        if !["daily", "hourly", "never"].contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }
        if config.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }

        for (name, value) in [
            ("repair_threshold", config.revision.repair_threshold),
            ("convergence threshold", config.convergence.threshold),
        ] {
            if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if config.convergence.iteration_cap == 0 {
            return Err(ConfigError::InvalidIterationCap);
        }
        if config.convergence.stable_iterations == 0 {
            return Err(ConfigError::InvalidStableIterations);
        }

        if config.scoring.max_prompt_chars < MIN_PROMPT_CHARS {
            return Err(ConfigError::PromptBudgetTooSmall(
                config.scoring.max_prompt_chars,
            ));
        }

        for (tier, model) in [
            ("fast", &config.models.fast),
            ("balanced", &config.models.balanced),
            ("complex", &config.models.complex),
        ] {
            if model.trim().is_empty() {
                return Err(ConfigError::EmptyModelName(tier));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ModelTier, RegressionPolicy};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{content}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".redraft/redraft.db");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.gateway.min_interval_ms, 3000);
        assert!((config.convergence.threshold - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.convergence.iteration_cap, 5);
        assert_eq!(config.scoring.tier, ModelTier::Balanced);
        assert_eq!(config.revision.tier, ModelTier::Fast);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
convergence:
  threshold: 4.2
  iteration_cap: 8
  regression_policy: rollback
gateway:
  tier_fallback: true
scoring:
  tier: complex
logging:
  level: debug
  format: json
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert!((config.convergence.threshold - 4.2).abs() < f64::EPSILON);
        assert_eq!(config.convergence.iteration_cap, 8);
        assert_eq!(config.convergence.regression_policy, RegressionPolicy::Rollback);
        assert!(config.gateway.tier_fallback);
        assert_eq!(config.scoring.tier, ModelTier::Complex);
        assert_eq!(config.convergence.stable_iterations, 1, "unset fields keep defaults");
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validation_failures() {
        let cases: [(fn(&mut Config), ConfigError); 14] = [
            (|c| c.database.path.clear(), ConfigError::EmptyDatabasePath),
            (|c| c.database.max_connections = 0, ConfigError::InvalidMaxConnections(0)),
            (
                |c| c.logging.level = "loud".to_string(),
                ConfigError::InvalidLogLevel("loud".to_string()),
            ),
            (
                |c| c.logging.format = "xml".to_string(),
                ConfigError::InvalidLogFormat("xml".to_string()),
            ),
            (
                |c| c.logging.rotation = "weekly".to_string(),
                ConfigError::InvalidRotation("weekly".to_string()),
            ),
            (|c| c.retry.max_attempts = 0, ConfigError::InvalidMaxAttempts),
            (
                |c| c.retry.initial_backoff_ms = 90_000,
                ConfigError::InvalidBackoff(90_000, 60_000),
            ),
            (|c| c.gateway.request_timeout_secs = 0, ConfigError::InvalidRequestTimeout),
            (
                |c| c.convergence.threshold = 5.5,
                ConfigError::ThresholdOutOfRange {
                    name: "convergence threshold",
                    value: 5.5,
                },
            ),
            (
                |c| c.revision.repair_threshold = 0.5,
                ConfigError::ThresholdOutOfRange {
                    name: "repair_threshold",
                    value: 0.5,
                },
            ),
            (|c| c.convergence.iteration_cap = 0, ConfigError::InvalidIterationCap),
            (|c| c.convergence.stable_iterations = 0, ConfigError::InvalidStableIterations),
            (
                |c| c.scoring.max_prompt_chars = 999,
                ConfigError::PromptBudgetTooSmall(999),
            ),
            (|c| c.models.fast = " ".to_string(), ConfigError::EmptyModelName("fast")),
        ];

        for (mutate, expected) in cases {
            let mut config = Config::default();
            mutate(&mut config);
            assert_eq!(ConfigLoader::validate(&config), Err(expected));
        }
    }

    #[test]
    fn test_equal_backoffs_are_valid() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 1000;
        config.retry.max_backoff_ms = 1000;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_hierarchical_merging() {
        let base = yaml_file("convergence:\n  threshold: 3.8\n  iteration_cap: 3\nlogging:\n  format: json");
        let overrides = yaml_file("convergence:\n  threshold: 4.4");

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base.path()))
            .merge(Yaml::file(overrides.path()))
            .extract()
            .unwrap();

        assert!((config.convergence.threshold - 4.4).abs() < f64::EPSILON, "Override should win");
        assert_eq!(config.convergence.iteration_cap, 3, "Base value should persist");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = yaml_file("retry:\n  max_attempts: 2\ngateway:\n  min_interval_ms: 500");

        let config = temp_env::with_vars(
            [
                ("REDRAFT_RETRY__MAX_ATTEMPTS", Some("5")),
                ("REDRAFT_SCORING__TIER", Some("fast")),
            ],
            || ConfigLoader::load_from_file(file.path()),
        )
        .unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.scoring.tier, ModelTier::Fast);
        assert_eq!(config.gateway.min_interval_ms, 500);
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let file = yaml_file("convergence:\n  iteration_cap: 0");
        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::InvalidIterationCap)
        );
    }
}
