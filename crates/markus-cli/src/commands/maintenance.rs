//! Maintenance command - read or set the maintenance flag.

use anyhow::Result;
use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::commands::{open_store, print_json};
use crate::{Config, OutputFormat};

/// Desired maintenance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    /// Answer 503 on the public endpoints.
    On,
    /// Serve normally.
    Off,
}

/// Arguments for the maintenance command.
#[derive(Debug, Args)]
pub struct MaintenanceArgs {
    /// New state; omit to print the current one.
    #[arg(value_enum)]
    pub state: Option<Switch>,
}

#[derive(Debug, Serialize)]
struct MaintenanceOutput {
    enabled: bool,
}

/// Execute the maintenance command.
///
/// # Errors
///
/// Returns an error if the flag cannot be read or written.
pub async fn execute(args: MaintenanceArgs, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let enabled = match args.state {
        Some(switch) => {
            let enabled = switch == Switch::On;
            store.run(move |s| s.set_maintenance(enabled)).await?;
            tracing::info!(enabled, "maintenance flag updated");
            enabled
        }
        None => store.run(|s| s.maintenance()).await?,
    };

    match config.format {
        OutputFormat::Json => print_json(&MaintenanceOutput { enabled })?,
        OutputFormat::Text | OutputFormat::Table => {
            if enabled {
                println!("Maintenance mode: {}", "ON".red().bold());
            } else {
                println!("Maintenance mode: {}", "off".green());
            }
        }
    }
    Ok(())
}
