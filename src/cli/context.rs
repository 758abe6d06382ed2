//! Wiring of adapters and services for one CLI invocation.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::adapters::generators::{AnthropicConfig, AnthropicGenerator, ScriptedGenerator};
use crate::adapters::retrieval::KeywordCorpus;
use crate::adapters::sqlite::{initialize_database, SqliteCacheStore, SqliteCheckpointStore};
use crate::domain::models::{Config, Draft};
use crate::domain::ports::{CacheStore, CheckpointStore, PaperRetriever, TextGenerator};
use crate::services::gateway::MinIntervalRateLimiter;
use crate::services::{BaselineReviser, ConvergenceController, RequestGateway};

/// How the engine reaches the generative service and the paper corpus.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions<'a> {
    pub corpus: Option<&'a Path>,
    /// Use the offline scripted generator; nothing leaves the process and
    /// no responses are persisted.
    pub dry_run: bool,
}

/// Services sharing one gateway and one checkpoint store.
pub struct Engine {
    pub config: Config,
    pub gateway: Arc<RequestGateway>,
    pub retriever: Arc<dyn PaperRetriever>,
    pub store: Arc<dyn CheckpointStore>,
}

impl Engine {
    pub async fn build(config: &Config, options: EngineOptions<'_>) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .context("Failed to initialize database")?;
        let store: Arc<dyn CheckpointStore> = Arc::new(SqliteCheckpointStore::new(pool.clone()));

        let gateway = if options.dry_run {
            info!("dry run: using the offline generator");
            let generator: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::dry_run());
            RequestGateway::from_config(config, generator, None)
                .with_rate_limiter(MinIntervalRateLimiter::from_millis(0))
        } else {
            let generator = AnthropicGenerator::new(AnthropicConfig::from_provider(&config.provider))
                .context("Failed to create generator")?;
            if !generator.is_configured() {
                bail!(
                    "No API key found in ${}; set it or pass --dry-run",
                    config.provider.api_key_env
                );
            }
            let cache_store: Arc<dyn CacheStore> = Arc::new(SqliteCacheStore::new(pool));
            RequestGateway::from_config(config, Arc::new(generator), Some(cache_store))
        };

        let warmed = gateway
            .warm_cache()
            .await
            .context("Failed to load cached responses")?;
        debug!(entries = warmed, "response cache warmed");

        Ok(Self {
            config: config.clone(),
            gateway: Arc::new(gateway),
            retriever: load_retriever(options.corpus)?,
            store,
        })
    }

    pub fn controller(&self) -> ConvergenceController {
        ConvergenceController::new(
            &self.config,
            self.gateway.clone(),
            self.retriever.clone(),
            self.store.clone(),
        )
    }

    pub fn baseline(&self) -> BaselineReviser {
        BaselineReviser::new(self.gateway.clone())
    }
}

/// Open the checkpoint store alone, for read-only commands.
pub async fn open_store(config: &Config) -> Result<Arc<dyn CheckpointStore>> {
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;
    Ok(Arc::new(SqliteCheckpointStore::new(pool)))
}

fn load_retriever(corpus: Option<&Path>) -> Result<Arc<dyn PaperRetriever>> {
    let corpus = match corpus {
        Some(path) => {
            let corpus = KeywordCorpus::from_json_file(path)
                .with_context(|| format!("Failed to load corpus from {}", path.display()))?;
            info!(papers = corpus.len(), path = %path.display(), "paper corpus loaded");
            corpus
        }
        None => KeywordCorpus::empty(),
    };
    Ok(Arc::new(corpus))
}

/// Read a draft from a JSON file with `topic` and `sections`.
///
/// Citation markers are re-derived from the section bodies. A missing topic
/// is filled from `topic` when one is given.
pub async fn load_draft(path: &Path, topic: Option<&str>) -> Result<Draft> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read draft {}", path.display()))?;
    let mut draft: Draft = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse draft {}", path.display()))?;

    if draft.sections.is_empty() {
        bail!("Draft {} has no sections", path.display());
    }
    if draft.topic.trim().is_empty() {
        match topic {
            Some(topic) => draft.topic = topic.to_string(),
            None => bail!("Draft {} has no topic", path.display()),
        }
    }
    for section in &mut draft.sections {
        section.refresh_citations();
    }
    Ok(draft)
}
