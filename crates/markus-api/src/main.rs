//! `markus-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::{Context, Result};

use markus_api::config::Config;
use markus_api::server::Server;
use markus_core::observability::{LogFormat, init_logging};
use markus_core::store::ParticipantStore;
use markus_core::upload::{CloudinaryGateway, MemoryGateway, UploadGateway};
use markus_sync::google::GoogleSheetsSource;
use markus_sync::source::load_sources;
use markus_sync::synchronizer::Synchronizer;

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(choose_log_format(&config));

    let store = ParticipantStore::open(config.database_path.clone()).with_context(|| {
        format!(
            "failed to open participant store at {}",
            config.database_path.display()
        )
    })?;

    let uploader: Arc<dyn UploadGateway> = if let Some(cloudinary) = config.upload.cloudinary() {
        tracing::info!(cloud = %cloudinary.cloud_name, folder = %cloudinary.folder, "Using Cloudinary uploads");
        Arc::new(CloudinaryGateway::new(cloudinary)?)
    } else {
        if !config.debug {
            anyhow::bail!("Cloudinary credentials are required when MARKUS_DEBUG=false");
        }
        tracing::warn!("Cloudinary not configured; using in-memory uploads (debug only)");
        Arc::new(MemoryGateway::new())
    };

    let mut builder = Server::builder(store.clone()).uploader(uploader);

    if let Some(path) = config.sources_path.as_deref() {
        let sources = load_sources(path)
            .with_context(|| format!("failed to load sync sources from {}", path.display()))?;
        let sheets = GoogleSheetsSource::new(config.google.credentials()).await?;
        tracing::info!(sources = sources.len(), "Spreadsheet sync enabled");
        builder = builder.synchronizer(Synchronizer::new(store, Arc::new(sheets), sources));
    } else {
        tracing::warn!("MARKUS_SOURCES_PATH not set; admin sync is disabled");
    }

    let server = builder.config(config).build();
    server.serve().await?;
    Ok(())
}
