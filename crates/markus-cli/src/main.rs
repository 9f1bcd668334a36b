//! MarkUs CLI - operator commands for the certificate portal.
//!
//! The main entry point for the `markus` CLI binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use markus_cli::commands::{maintenance, pregen, records, render, stats, sync};
use markus_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "info" } else { "warn" };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = cli.config();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Sync(args) => sync::execute(args, &config).await,
            Commands::Pregen(args) => pregen::execute(args, &config).await,
            Commands::Render(args) => render::execute(args, &config).await,
            Commands::Lookup(args) => records::execute_lookup(args, &config).await,
            Commands::Block(args) => records::execute_block(args, &config, true).await,
            Commands::Unblock(args) => records::execute_block(args, &config, false).await,
            Commands::Maintenance(args) => maintenance::execute(args, &config).await,
            Commands::Stats => stats::execute(&config).await,
        }
    })
}
