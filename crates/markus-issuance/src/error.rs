//! Error types for rendering and issuance.

use std::path::PathBuf;
use std::time::Duration;

use markus_core::store::StoreError;
use markus_core::upload::UploadError;

/// Errors producing a certificate image.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The certificate template image does not exist.
    #[error("certificate template not found: {}", path.display())]
    TemplateMissing {
        /// Configured template path.
        path: PathBuf,
    },

    /// None of the candidate font files could be loaded.
    #[error("no usable font found (tried {} paths)", tried.len())]
    FontMissing {
        /// Every path that was tried, in order.
        tried: Vec<PathBuf>,
    },

    /// Decoding the template or encoding the output failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors issuing a certificate.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    /// No record for the roll number and event.
    #[error("no registration for {roll_no} in {event}")]
    NotFound {
        /// Requested roll number.
        roll_no: String,
        /// Requested event.
        event: String,
    },

    /// The record is administratively blocked.
    #[error("certificate for {roll_no} in {event} is withheld")]
    Suppressed {
        /// Requested roll number.
        roll_no: String,
        /// Requested event.
        event: String,
    },

    /// Another request holds the claim and did not finish in time.
    #[error("certificate generation in progress; retry in {}s", retry_after.as_secs())]
    InProgress {
        /// Suggested client back-off.
        retry_after: Duration,
    },

    /// Rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Uploading failed.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Store access failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The generation task panicked or was aborted.
    #[error("generation task failed: {0}")]
    Task(String),
}

impl IssueError {
    /// Returns true for failures of the generation pipeline itself, as
    /// opposed to outcomes the caller can act on.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Render(_) | Self::Upload(_) | Self::Store(_) | Self::Task(_)
        )
    }
}
