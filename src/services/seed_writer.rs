//! Seed writer: a first draft from nothing but a topic.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::GatewayError;
use crate::domain::models::{
    Draft, ModelTier, Paper, RevisionNote, RevisionOutcome, Section,
};
use crate::domain::ports::PaperRetriever;
use crate::services::gateway::RequestGateway;
use crate::services::prompts::{outline_prompt, section_prompt};

/// Papers retrieved for a seed draft.
pub const SEED_PAPER_LIMIT: usize = 20;

/// Outline used when the service cannot provide one.
pub const DEFAULT_OUTLINE: [&str; 6] = [
    "Introduction",
    "Background",
    "Core Methods",
    "Applications",
    "Open Challenges",
    "Conclusion",
];

static OUTLINE_NUMBERING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#+|[-*•]|\(?\d+[.):]|[IVXivx]+[.)]|Section\s+\d+[.:]?)\s*")
        .expect("outline numbering pattern is valid")
});

/// Section titles from an outline response, numbering and emphasis stripped.
pub fn parse_outline(response: &str, limit: usize) -> Vec<String> {
    response
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = OUTLINE_NUMBERING.replace(line, "");
            line.trim().trim_matches('*').trim().to_string()
        })
        .filter(|title| !title.is_empty())
        .take(limit)
        .collect()
}

fn default_outline(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            DEFAULT_OUTLINE
                .get(i)
                .map_or_else(|| format!("Section {}", i + 1), |t| (*t).to_string())
        })
        .collect()
}

fn placeholder_body(title: &str) -> String {
    format!("[This section on {title} could not be generated and needs to be written.]")
}

/// Generates seed drafts through the gateway on the balanced tier.
pub struct SeedWriter {
    gateway: Arc<RequestGateway>,
    retriever: Arc<dyn PaperRetriever>,
    tier: ModelTier,
}

impl SeedWriter {
    pub fn new(gateway: Arc<RequestGateway>, retriever: Arc<dyn PaperRetriever>) -> Self {
        Self {
            gateway,
            retriever,
            tier: ModelTier::Balanced,
        }
    }

    /// Write a draft of `section_count` sections on `topic`.
    ///
    /// Never fails. Sections the service could not write get a placeholder
    /// body with degraded provenance and a note naming the failure.
    #[instrument(skip(self))]
    pub async fn write(&self, topic: &str, section_count: usize) -> Draft {
        let section_count = section_count.max(1);
        let papers = self.retrieve(topic).await;
        let outline = self.outline(topic, section_count, &papers).await;

        let mut sections = Vec::with_capacity(outline.len());
        let mut notes = Vec::new();
        for (index, title) in outline.iter().enumerate() {
            let prompt = section_prompt(topic, title, &outline, &papers);
            match self.gateway.invoke(&prompt, self.tier).await {
                Ok(body) => sections.push(Section::generated(title.as_str(), body.trim())),
                Err(e) => {
                    warn!(section = index, title = %title, error = %e, "section generation failed");
                    sections.push(Section::degraded(title.as_str(), placeholder_body(title)));
                    notes.push(RevisionNote::for_section(index, failure_outcome(e)));
                }
            }
        }

        info!(
            sections = sections.len(),
            degraded = notes.len(),
            papers = papers.len(),
            "seed draft written"
        );
        Draft {
            notes,
            ..Draft::new(topic, sections)
        }
    }

    async fn retrieve(&self, topic: &str) -> Vec<Paper> {
        match self.retriever.search(topic, SEED_PAPER_LIMIT).await {
            Ok(papers) => papers,
            Err(e) => {
                warn!(error = %e, "retrieval failed, writing without reference papers");
                Vec::new()
            }
        }
    }

    async fn outline(&self, topic: &str, count: usize, papers: &[Paper]) -> Vec<String> {
        let prompt = outline_prompt(topic, count, papers);
        match self.gateway.invoke(&prompt, self.tier).await {
            Ok(response) => {
                let titles = parse_outline(&response, count);
                if titles.is_empty() {
                    warn!("outline response had no titles, using default outline");
                    default_outline(count)
                } else {
                    debug!(titles = ?titles, "outline generated");
                    titles
                }
            }
            Err(e) => {
                warn!(error = %e, "outline generation failed, using default outline");
                default_outline(count)
            }
        }
    }
}

fn failure_outcome(error: GatewayError) -> RevisionOutcome {
    match error {
        GatewayError::Unavailable { .. } => RevisionOutcome::Unavailable {
            detail: error.to_string(),
        },
        GatewayError::Malformed(detail) => RevisionOutcome::Malformed { detail },
    }
}
