//! Implementation of the `redraft run` command.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cli::commands::{cancel_on_interrupt, write_markdown, ReportOutput};
use crate::cli::context::{load_draft, Engine, EngineOptions};
use crate::cli::output::output;
use crate::domain::models::Config;
use crate::services::RunHandle;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Survey topic
    #[arg(short, long)]
    pub topic: String,

    /// Starting draft as JSON; a seed draft is generated when omitted
    #[arg(short, long)]
    pub draft: Option<PathBuf>,

    /// Paper corpus as a JSON array of {id, title, abstract}
    #[arg(short, long)]
    pub corpus: Option<PathBuf>,

    /// Number of sections in a generated seed draft
    #[arg(short, long)]
    pub sections: Option<usize>,

    /// Run identifier (generated when omitted)
    #[arg(long)]
    pub run_id: Option<String>,

    /// Use the offline generator instead of the remote service
    #[arg(long)]
    pub dry_run: bool,

    /// Write the final draft as Markdown to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(args: RunArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut config = config.clone();
    if let Some(sections) = args.sections {
        config.revision.seed_sections = sections.max(1);
    }

    let draft = match &args.draft {
        Some(path) => Some(load_draft(path, Some(&args.topic)).await?),
        None => None,
    };

    let engine = Engine::build(
        &config,
        EngineOptions {
            corpus: args.corpus.as_deref(),
            dry_run: args.dry_run,
        },
    )
    .await?;

    let handle = RunHandle::new();
    let interrupt = cancel_on_interrupt(&handle);
    let result = engine
        .controller()
        .run(&args.topic, draft, args.run_id, &handle)
        .await;
    interrupt.abort();
    let report = result?;

    if let Some(path) = &args.output {
        write_markdown(path, &report.final_draft.to_markdown()).await?;
    }
    output(&ReportOutput::new(report, args.output), json_mode);
    Ok(())
}
