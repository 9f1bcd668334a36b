//! Sync command - pull registrations from the configured spreadsheets.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use owo_colors::OwoColorize;

use markus_sync::google::{GoogleCredentials, GoogleSheetsSource};
use markus_sync::source::{SourceConfig, load_sources};
use markus_sync::synchronizer::{SourceOutcome, SyncReport, Synchronizer};

use crate::commands::{open_store, print_json};
use crate::{Config, OutputFormat};

/// Arguments for the sync command.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// JSON file listing the spreadsheet sources.
    #[arg(long, env = "MARKUS_SOURCES_PATH")]
    pub sources: PathBuf,

    /// Only sync the named sources (repeatable).
    #[arg(long = "source", short = 's')]
    pub only: Vec<String>,

    /// Inline service-account key JSON.
    #[arg(long, env = "MARKUS_GOOGLE_CREDENTIALS_JSON", hide_env_values = true)]
    pub credentials_json: Option<String>,

    /// Service-account key file.
    #[arg(long, env = "MARKUS_GOOGLE_CREDENTIALS_PATH")]
    pub credentials_path: Option<PathBuf>,
}

impl SyncArgs {
    fn credentials(&self) -> GoogleCredentials {
        if let Some(json) = &self.credentials_json {
            GoogleCredentials::Json(json.clone())
        } else if let Some(path) = &self.credentials_path {
            GoogleCredentials::File(path.clone())
        } else {
            GoogleCredentials::Ambient
        }
    }
}

/// Keeps the sources named in `only`, or all of them when it is empty.
///
/// # Errors
///
/// Returns an error if a requested name is not configured.
pub fn select_sources(sources: Vec<SourceConfig>, only: &[String]) -> Result<Vec<SourceConfig>> {
    if only.is_empty() {
        return Ok(sources);
    }
    if let Some(missing) = only
        .iter()
        .find(|name| !sources.iter().any(|s| &s.name == *name))
    {
        bail!("unknown source: {missing}");
    }
    Ok(sources
        .into_iter()
        .filter(|s| only.contains(&s.name))
        .collect())
}

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or any source
/// failed. Successful sources are written either way.
pub async fn execute(args: SyncArgs, config: &Config) -> Result<()> {
    let sources = load_sources(&args.sources)
        .with_context(|| format!("failed to load sources from {}", args.sources.display()))?;
    let sources = select_sources(sources, &args.only)?;
    let store = open_store(config)?;
    let sheets = GoogleSheetsSource::new(args.credentials()).await?;

    let report = Synchronizer::new(store, Arc::new(sheets), sources)
        .run()
        .await;

    match config.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text | OutputFormat::Table => print_report(&report),
    }

    let failed = report.failed_count();
    if failed > 0 {
        bail!("{failed} source(s) failed");
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    for source in &report.sources {
        match &source.outcome {
            SourceOutcome::Synced(stats) => println!(
                "{} {} ({}): {} rows, {} leaders ({} new), {} members, {} skipped, {} rejected",
                "✓".green(),
                source.name.bold(),
                source.event,
                stats.rows_seen,
                stats.leaders,
                stats.leaders_inserted,
                stats.members,
                stats.skipped_rows,
                stats.rejected_members
            ),
            SourceOutcome::Failed { error } => println!(
                "{} {} ({}): {}",
                "✗".red(),
                source.name.bold(),
                source.event,
                error.red()
            ),
        }
    }
    let totals = report.totals();
    println!();
    println!(
        "Synced {} leaders and {} members in {}s",
        totals.leaders,
        totals.members,
        (report.finished_at - report.started_at).num_seconds()
    );
}
