//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::baseline::BaselineArgs;
use crate::cli::commands::list::ListArgs;
use crate::cli::commands::resume::ResumeArgs;
use crate::cli::commands::run::RunArgs;
use crate::cli::commands::show::ShowArgs;

#[derive(Parser)]
#[command(name = "redraft")]
#[command(about = "Redraft - convergence-driven survey revision", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .redraft/config.yaml and .redraft/local.yaml)
    #[arg(short, long, global = true, env = "REDRAFT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score and revise a draft until it converges or the cap is reached
    Run(RunArgs),

    /// Continue a checkpointed run
    Resume(ResumeArgs),

    /// Apply one two-pass neighbour refinement to a draft
    Baseline(BaselineArgs),

    /// Show the report of a checkpointed run
    Show(ShowArgs),

    /// List recent runs
    List(ListArgs),
}
