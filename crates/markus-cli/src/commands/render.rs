//! Render command - draw one certificate to disk without issuing it.
//!
//! Useful for checking template alignment. The record's issuance state is
//! left untouched and nothing is uploaded.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use markus_core::roll::normalize_roll;
use markus_issuance::renderer::{ArtifactRenderer, CertificateRequest};

use crate::commands::{RenderOptions, open_store, print_json};
use crate::{Config, OutputFormat};

/// Arguments for the render command.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Roll number, any case.
    pub roll_no: String,
    /// Event key.
    pub event: String,

    /// Rendering options.
    #[command(flatten)]
    pub render: RenderOptions,
}

#[derive(Debug, Serialize)]
struct RenderOutput {
    roll_no: String,
    event: String,
    path: PathBuf,
}

/// Execute the render command.
///
/// # Errors
///
/// Returns an error if the record does not exist or rendering fails.
pub async fn execute(args: RenderArgs, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let roll_no = normalize_roll(&args.roll_no);
    let event = args.event.trim().to_string();

    let lookup = (roll_no.clone(), event.clone());
    let record = store
        .run(move |s| s.find_record(&lookup.0, &lookup.1))
        .await?
        .with_context(|| format!("no record for {roll_no} in {event}"))?;

    let request = CertificateRequest::from_record(&record);
    let renderer = Arc::new(args.render.renderer());
    let path = tokio::task::spawn_blocking(move || renderer.render(&request)).await??;

    let output = RenderOutput {
        roll_no,
        event,
        path,
    };
    match config.format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text | OutputFormat::Table => println!("{}", output.path.display()),
    }
    Ok(())
}
