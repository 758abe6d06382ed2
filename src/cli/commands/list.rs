//! Implementation of the `redraft list` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::context::open_store;
use crate::cli::output::{output, CommandOutput};
use crate::cli::table::runs_table;
use crate::domain::models::{Config, RunPhase, RunState};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum number of runs to display
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub topic: String,
    pub phase: RunPhase,
    pub iterations: usize,
    pub final_score: Option<f64>,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct RunListOutput {
    pub runs: Vec<RunSummary>,
    #[serde(skip)]
    states: Vec<RunState>,
}

impl RunListOutput {
    fn new(states: Vec<RunState>) -> Self {
        let runs = states
            .iter()
            .map(|s| RunSummary {
                run_id: s.run_id.clone(),
                topic: s.draft.topic.clone(),
                phase: s.phase,
                iterations: s.trace.len(),
                final_score: s.final_score(),
                updated_at: s.updated_at.to_rfc3339(),
            })
            .collect();
        Self { runs, states }
    }
}

impl CommandOutput for RunListOutput {
    fn to_human(&self) -> String {
        if self.states.is_empty() {
            return "No runs found.".to_string();
        }
        let noun = if self.states.len() == 1 { "run" } else { "runs" };
        format!("{} {noun}:\n{}", self.states.len(), runs_table(&self.states))
    }
}

pub async fn execute(args: ListArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = open_store(config).await?;
    let states = store.list_recent(args.limit).await?;
    output(&RunListOutput::new(states), json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Draft, Section};

    #[test]
    fn test_empty_listing() {
        assert_eq!(RunListOutput::new(vec![]).to_human(), "No runs found.");
    }

    #[test]
    fn test_listing_json_has_summaries() {
        let state = RunState::new("r-9", Draft::new("Topic", vec![Section::new("A", "a")]));
        let out = RunListOutput::new(vec![state]);
        assert!(out.to_human().starts_with("1 run:"));
        let json = out.to_json();
        assert_eq!(json["runs"][0]["run_id"], "r-9");
        assert_eq!(json["runs"][0]["phase"], "init");
        assert!(json["runs"][0]["final_score"].is_null());
    }
}
