//! Error types for spreadsheet sources and synchronization.

use markus_core::store::StoreError;

/// Errors fetching a sheet from a source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Credentials could not be loaded or a token could not be minted.
    #[error("credential error: {0}")]
    Credentials(String),

    /// The spreadsheet or range does not exist (or is not shared with us).
    #[error("sheet not found: {name}")]
    SheetNotFound {
        /// Source name that was requested.
        name: String,
    },

    /// Transport-level failure.
    #[error("sheet request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The sheet service answered with an error status.
    #[error("sheet service returned {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Body or message returned.
        message: String,
    },

    /// The source is misconfigured.
    #[error("invalid source configuration: {0}")]
    Config(String),
}

/// Errors while synchronizing one source.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Fetching the sheet failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A required column could not be detected in the header row.
    #[error("source {source_name}: no {column} column in headers")]
    MissingColumn {
        /// Source name.
        source_name: String,
        /// Which column was missing.
        column: &'static str,
    },

    /// Writing to the participant store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The source list could not be loaded.
    #[error("invalid source list: {0}")]
    Config(String),
}
