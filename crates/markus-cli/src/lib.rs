//! # markus-cli
//!
//! Operator command-line interface for the MarkUs certificate portal.
//!
//! ## Commands
//!
//! - `markus sync` - Pull registrations from the configured spreadsheets
//! - `markus pregen` - Generate every pending certificate ahead of time
//! - `markus render` - Render one certificate locally without uploading
//! - `markus lookup` - Show every record of a roll number
//! - `markus block` / `markus unblock` - Withhold or restore a certificate
//! - `markus maintenance` - Read or set the maintenance flag
//! - `markus stats` - Per-event issuance totals
//!
//! ## Configuration
//!
//! Settings come from flags or the same environment variables the server
//! reads:
//!
//! - `MARKUS_DATABASE_PATH` - Participant database (default: `participants.db`)
//! - `MARKUS_SOURCES_PATH` - Sync source list
//! - `MARKUS_TEMPLATE_PATH`, `MARKUS_FONT_PATH`, `MARKUS_GENERATED_DIR` - Rendering
//! - `CLOUDINARY_*` - Upload credentials

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MarkUs CLI - certificate portal operations.
#[derive(Debug, Parser)]
#[command(name = "markus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Participant database file.
    #[arg(long, env = "MARKUS_DATABASE_PATH", default_value = "participants.db")]
    pub database: PathBuf,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Log progress at info level (default: warnings only).
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            database_path: self.database.clone(),
            format: self.format.clone(),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pull registrations from the configured spreadsheets.
    Sync(commands::sync::SyncArgs),
    /// Generate every pending certificate ahead of time.
    Pregen(commands::pregen::PregenArgs),
    /// Render one certificate locally without uploading it.
    Render(commands::render::RenderArgs),
    /// Show every record of a roll number.
    Lookup(commands::records::LookupArgs),
    /// Withhold a certificate.
    Block(commands::records::RecordKeyArgs),
    /// Restore a withheld certificate.
    Unblock(commands::records::RecordKeyArgs),
    /// Read or set the maintenance flag.
    Maintenance(commands::maintenance::MaintenanceArgs),
    /// Per-event issuance totals.
    Stats,
}

/// Output format.
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Participant database file.
    pub database_path: PathBuf,
    /// Output format.
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_from_flags() {
        let cli = Cli::parse_from([
            "markus",
            "--database",
            "/tmp/p.db",
            "--format",
            "json",
            "lookup",
            "23cs001",
        ]);

        let config = cli.config();
        assert_eq!(config.database_path, PathBuf::from("/tmp/p.db"));
        assert!(matches!(config.format, OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Lookup(ref args) if args.roll_no == "23cs001"));
    }

    #[test]
    fn test_block_takes_roll_and_event() {
        let cli = Cli::parse_from(["markus", "block", "23CS001", "CODE ADAPT"]);
        let Commands::Block(args) = cli.command else {
            panic!("expected block");
        };
        assert_eq!(args.roll_no, "23CS001");
        assert_eq!(args.event, "CODE ADAPT");
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
