//! # markus-sync
//!
//! Pulls registration rows from external spreadsheets and upserts them into
//! the participant store.
//!
//! A pass walks every configured source in order:
//!
//! 1. fetch the sheet (header row plus data rows, all strings)
//! 2. detect the roll, name, department, year and team-member columns
//! 3. accept or skip each row, and accept or reject each team member
//! 4. upsert the leader and replace its members, one transaction per row
//!
//! A failing source is logged and skipped; the pass always continues.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod columns;
pub mod error;
pub mod google;
pub mod rows;
pub mod source;
pub mod synchronizer;

pub use error::{SourceError, SyncError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::columns::{ColumnLayout, ColumnPolicy, MemberColumns, detect_columns};
    pub use crate::error::{SourceError, SyncError};
    pub use crate::google::{GoogleCredentials, GoogleSheetsSource};
    pub use crate::rows::{MemberRejection, RowDecision, SkipReason, read_row};
    pub use crate::source::{SheetSource, SheetTable, SourceConfig, StaticSheetSource, load_sources};
    pub use crate::synchronizer::{SourceOutcome, SourceReport, SourceStats, SyncReport, Synchronizer};
}
