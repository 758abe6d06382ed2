//! Redraft CLI entry point.

use anyhow::Result;
use clap::Parser;

use redraft::cli::{commands, Cli, Commands};
use redraft::infrastructure::config::ConfigLoader;
use redraft::infrastructure::logging::LoggerImpl;

async fn dispatch(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &config, cli.json).await,
        Commands::Resume(args) => commands::resume::execute(args, &config, cli.json).await,
        Commands::Baseline(args) => commands::baseline::execute(args, &config, cli.json).await,
        Commands::Show(args) => commands::show::execute(args, &config, cli.json).await,
        Commands::List(args) => commands::list::execute(args, &config, cli.json).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = dispatch(cli).await {
        redraft::cli::handle_error(err, json_mode);
    }
}
