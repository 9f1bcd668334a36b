//! CLI command implementations.

pub mod maintenance;
pub mod pregen;
pub mod records;
pub mod render;
pub mod stats;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use markus_core::store::ParticipantStore;
use markus_core::upload::{CloudinaryConfig, DEFAULT_UPLOAD_FOLDER};
use markus_issuance::renderer::{DEFAULT_TEMPLATE_PATH, TemplateRenderer};

use crate::Config;

/// Certificate rendering options shared by `pregen` and `render`.
#[derive(Debug, Clone, Args)]
pub struct RenderOptions {
    /// Certificate template image.
    #[arg(long, env = "MARKUS_TEMPLATE_PATH", default_value = DEFAULT_TEMPLATE_PATH)]
    pub template: PathBuf,

    /// Preferred font file; built-in fallbacks are tried after it.
    #[arg(long, env = "MARKUS_FONT_PATH")]
    pub font: Option<PathBuf>,

    /// Directory rendered certificates are written to.
    #[arg(long, env = "MARKUS_GENERATED_DIR", default_value = "generated")]
    pub output_dir: PathBuf,
}

impl RenderOptions {
    /// Builds a renderer from these options.
    #[must_use]
    pub fn renderer(&self) -> TemplateRenderer {
        TemplateRenderer::new(
            self.template.clone(),
            self.font.clone(),
            self.output_dir.clone(),
        )
    }
}

/// Cloudinary credentials.
#[derive(Debug, Clone, Args)]
pub struct UploadOptions {
    /// Cloudinary cloud name.
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    pub cloud_name: Option<String>,

    /// Cloudinary API key.
    #[arg(long, env = "CLOUDINARY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Cloudinary API secret.
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Destination folder.
    #[arg(long, env = "MARKUS_UPLOAD_FOLDER", default_value = DEFAULT_UPLOAD_FOLDER)]
    pub folder: String,
}

impl UploadOptions {
    /// Returns the Cloudinary settings.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing credential.
    pub fn cloudinary(&self) -> Result<CloudinaryConfig> {
        Ok(CloudinaryConfig {
            cloud_name: self
                .cloud_name
                .clone()
                .context("CLOUDINARY_CLOUD_NAME is required")?,
            api_key: self
                .api_key
                .clone()
                .context("CLOUDINARY_API_KEY is required")?,
            api_secret: self
                .api_secret
                .clone()
                .context("CLOUDINARY_API_SECRET is required")?,
            folder: self.folder.clone(),
        })
    }
}

/// Opens the participant store named by the configuration.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub fn open_store(config: &Config) -> Result<ParticipantStore> {
    ParticipantStore::open(config.database_path.clone()).with_context(|| {
        format!(
            "failed to open participant store at {}",
            config.database_path.display()
        )
    })
}

/// Prints `value` as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
