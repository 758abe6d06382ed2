//! Implementation of the `redraft baseline` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::commands::write_markdown;
use crate::cli::context::{load_draft, Engine, EngineOptions};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, Dimension, Draft, UsageSnapshot, Verdict};
use crate::services::QualityScorer;

#[derive(Args, Debug)]
pub struct BaselineArgs {
    /// Draft to refine, as JSON
    #[arg(short, long)]
    pub draft: PathBuf,

    /// Paper corpus as a JSON array of {id, title, abstract}
    #[arg(short, long)]
    pub corpus: Option<PathBuf>,

    /// Score the draft before and after refinement
    #[arg(long)]
    pub score: bool,

    /// Use the offline generator instead of the remote service
    #[arg(long)]
    pub dry_run: bool,

    /// Write the refined draft as Markdown to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct BaselineOutput {
    pub draft: Draft,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Verdict>,
    pub gateway: UsageSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<PathBuf>,
}

fn verdict_line(label: &str, verdict: &Verdict) -> String {
    let dims: Vec<String> = Dimension::ALL
        .iter()
        .map(|d| format!("{}={:.2}", d.as_str(), verdict.score(*d)))
        .collect();
    let degraded = if verdict.is_degraded() { " (degraded)" } else { "" };
    format!(
        "{label}: {:.2}{degraded}  {}",
        verdict.overall_score(),
        dims.join(" ")
    )
}

impl CommandOutput for BaselineOutput {
    fn to_human(&self) -> String {
        let failed = self.draft.notes.len();
        let mut lines = vec![format!(
            "Baseline refinement of {} sections ({failed} left unchanged after failures)",
            self.draft.sections.len()
        )];
        if let Some(before) = &self.before {
            lines.push(verdict_line("Before", before));
        }
        if let Some(after) = &self.after {
            lines.push(verdict_line("After", after));
        }
        lines.push(format!("Gateway: {}", self.gateway.format_summary()));
        lines.push(String::new());
        match &self.written_to {
            Some(path) => lines.push(format!("Refined draft written to {}", path.display())),
            None => lines.push(self.draft.to_markdown()),
        }
        lines.join("\n")
    }
}

pub async fn execute(args: BaselineArgs, config: &Config, json_mode: bool) -> Result<()> {
    let draft = load_draft(&args.draft, None).await?;
    let engine = Engine::build(
        config,
        EngineOptions {
            corpus: args.corpus.as_deref(),
            dry_run: args.dry_run,
        },
    )
    .await?;

    let scorer = args
        .score
        .then(|| QualityScorer::new(engine.gateway.clone(), config.scoring.clone()));

    let before = match &scorer {
        Some(scorer) => Some(scorer.score(&draft).await),
        None => None,
    };
    let refined = engine.baseline().refine(&draft).await;
    let after = match &scorer {
        Some(scorer) => Some(scorer.score(&refined).await),
        None => None,
    };

    if let Some(path) = &args.output {
        write_markdown(path, &refined.to_markdown()).await?;
    }
    output(
        &BaselineOutput {
            draft: refined,
            before,
            after,
            gateway: engine.gateway.usage(),
            written_to: args.output,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DimensionScores;

    #[test]
    fn test_verdict_line_marks_degraded() {
        let line = verdict_line("Before", &Verdict::degraded());
        assert!(line.starts_with("Before: 3.50 (degraded)"));

        let line = verdict_line(
            "After",
            &Verdict::genuine(DimensionScores::uniform(4.0), vec![], false),
        );
        assert!(line.contains("coverage=4.00"));
        assert!(!line.contains("degraded"));
    }
}
