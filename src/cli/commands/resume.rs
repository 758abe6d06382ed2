//! Implementation of the `redraft resume` command.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cli::commands::{cancel_on_interrupt, write_markdown, ReportOutput};
use crate::cli::context::{Engine, EngineOptions};
use crate::cli::output::output;
use crate::domain::models::Config;
use crate::services::RunHandle;

#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Run identifier
    pub run_id: String,

    /// Paper corpus as a JSON array of {id, title, abstract}
    #[arg(short, long)]
    pub corpus: Option<PathBuf>,

    /// Use the offline generator instead of the remote service
    #[arg(long)]
    pub dry_run: bool,

    /// Write the final draft as Markdown to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(args: ResumeArgs, config: &Config, json_mode: bool) -> Result<()> {
    let engine = Engine::build(
        config,
        EngineOptions {
            corpus: args.corpus.as_deref(),
            dry_run: args.dry_run,
        },
    )
    .await?;

    let handle = RunHandle::new();
    let interrupt = cancel_on_interrupt(&handle);
    let result = engine.controller().resume(&args.run_id, &handle).await;
    interrupt.abort();
    let report = result?;

    if let Some(path) = &args.output {
        write_markdown(path, &report.final_draft.to_markdown()).await?;
    }
    output(&ReportOutput::new(report, args.output), json_mode);
    Ok(())
}
