//! CLI command implementations.

pub mod baseline;
pub mod list;
pub mod resume;
pub mod run;
pub mod show;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::output::{format_score, CommandOutput};
use crate::cli::table::trace_table;
use crate::domain::models::RunReport;
use crate::services::RunHandle;

/// Cancel `handle` on the first Ctrl-C. Abort the returned task once the run ends.
pub(crate) fn cancel_on_interrupt(handle: &RunHandle) -> JoinHandle<()> {
    let handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping at the next checkpoint");
            handle.cancel();
        }
    })
}

/// Write `markdown` to `path`, creating parent directories.
pub(crate) async fn write_markdown(path: &Path, markdown: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, markdown)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "draft written");
    Ok(())
}

/// A run report as printed by `run`, `resume` and `show`.
#[derive(Debug, Serialize)]
pub struct ReportOutput {
    #[serde(flatten)]
    pub report: RunReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<PathBuf>,
}

impl ReportOutput {
    pub fn new(report: RunReport, written_to: Option<PathBuf>) -> Self {
        Self { report, written_to }
    }
}

impl CommandOutput for ReportOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let status = report
            .termination
            .map_or_else(|| report.phase.to_string(), |t| t.to_string());

        let mut lines = vec![
            format!("Run {}: {}", report.run_id, status),
            format!(
                "Scoring calls: {}  final: {}  best iteration: {}",
                report.scoring_calls(),
                format_score(report.final_score()),
                report
                    .best_iteration
                    .map_or_else(|| "-".to_string(), |i| i.to_string())
            ),
        ];
        if report.degraded_iterations > 0 {
            lines.push(format!(
                "Degraded iterations: {} (scores not authoritative)",
                report.degraded_iterations
            ));
        }
        if report.gateway.invocations > 0 {
            lines.push(format!("Gateway: {}", report.gateway.format_summary()));
        }
        if !report.trace.is_empty() {
            lines.push(String::new());
            lines.push(trace_table(&report.trace).to_string());
        }
        lines.push(String::new());
        match &self.written_to {
            Some(path) => lines.push(format!("Final draft written to {}", path.display())),
            None => lines.push(report.final_draft.to_markdown()),
        }
        lines.join("\n")
    }
}
