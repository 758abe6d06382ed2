//! Implementation of the `redraft show` command.

use anyhow::Result;
use clap::Args;

use crate::cli::commands::ReportOutput;
use crate::cli::context::open_store;
use crate::cli::output::output;
use crate::domain::errors::RunError;
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Run identifier
    pub run_id: String,
}

pub async fn execute(args: ShowArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = open_store(config).await?;
    let state = store
        .load(&args.run_id)
        .await?
        .ok_or_else(|| RunError::NotFound(args.run_id.clone()))?;

    output(&ReportOutput::new(state.report(), None), json_mode);
    Ok(())
}
