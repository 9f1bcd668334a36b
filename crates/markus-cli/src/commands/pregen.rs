//! Pregen command - issue every pending certificate ahead of time.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;
use owo_colors::OwoColorize;

use markus_core::upload::CloudinaryGateway;
use markus_issuance::coordinator::IssuanceCoordinator;
use markus_issuance::pregen::{PregenReport, pregenerate};

use crate::commands::{RenderOptions, UploadOptions, open_store, print_json};
use crate::{Config, OutputFormat};

/// Arguments for the pregen command.
#[derive(Debug, Args)]
pub struct PregenArgs {
    /// Only generate certificates for this event.
    #[arg(long)]
    pub event: Option<String>,

    /// Maximum certificates rendered at once.
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Rendering options.
    #[command(flatten)]
    pub render: RenderOptions,

    /// Upload credentials.
    #[command(flatten)]
    pub upload: UploadOptions,
}

/// Execute the pregen command.
///
/// # Errors
///
/// Returns an error if the uploader cannot be configured, the pending list
/// cannot be read, or any certificate failed.
pub async fn execute(args: PregenArgs, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let gateway = CloudinaryGateway::new(args.upload.cloudinary()?)?;
    let coordinator =
        IssuanceCoordinator::new(store, Arc::new(args.render.renderer()), Arc::new(gateway));

    let report = pregenerate(
        &coordinator,
        args.event.as_deref(),
        usize::from(args.concurrency),
    )
    .await?;

    match config.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text | OutputFormat::Table => print_report(&report),
    }

    if report.failed > 0 {
        bail!("{} certificate(s) failed to generate", report.failed);
    }
    Ok(())
}

fn print_report(report: &PregenReport) {
    println!("{} {}", "Generated:".bold(), report.generated.green());
    println!("{} {}", "Skipped:".bold(), report.skipped);
    if report.failed > 0 {
        println!("{} {}", "Failed:".bold(), report.failed.red());
    } else {
        println!("{} 0", "Failed:".bold());
    }
}
