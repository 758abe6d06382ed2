//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;
pub mod table;
pub mod types;

pub use types::{Cli, Commands};

use crate::domain::errors::RunError;

/// Print `err` (as JSON in json mode) and exit with a non-zero status.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let code = match err.downcast_ref::<RunError>() {
        Some(RunError::NotFound(_)) => 2,
        Some(RunError::Storage { .. }) => 3,
        None => 1,
    };

    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": chain,
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(code);
}
