//! Spreadsheet source configuration and the fetch seam.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::columns::ColumnPolicy;
use crate::error::{SourceError, SyncError};

/// One external registration sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique source name; stored as record provenance.
    pub name: String,
    /// Canonical event name the rows register for.
    pub event: String,
    /// Spreadsheet identifier.
    #[serde(default)]
    pub spreadsheet_id: String,
    /// A1 range to read; defaults to the first sheet.
    #[serde(default)]
    pub range: Option<String>,
    /// Column-detection policy.
    #[serde(default)]
    pub columns: ColumnPolicy,
}

impl SourceConfig {
    /// Creates a source with the default column policy.
    #[must_use]
    pub fn new(name: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event: event.into(),
            spreadsheet_id: String::new(),
            range: None,
            columns: ColumnPolicy::default(),
        }
    }

    /// Sets the spreadsheet identifier.
    #[must_use]
    pub fn with_spreadsheet_id(mut self, id: impl Into<String>) -> Self {
        self.spreadsheet_id = id.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    sources: Vec<SourceConfig>,
}

/// Loads the source list from a JSON file of the form
/// `{ "sources": [ { "name": ..., "event": ..., "spreadsheet_id": ... } ] }`.
///
/// # Errors
///
/// Returns [`SyncError::Config`] if the file is unreadable, malformed, or
/// lists duplicate or empty names/events.
pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>, SyncError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| SyncError::Config(format!("failed to read {}: {e}", path.display())))?;
    parse_sources(&raw)
}

/// Parses and validates a source list.
///
/// # Errors
///
/// Returns [`SyncError::Config`] on malformed JSON or invalid entries.
pub fn parse_sources(raw: &str) -> Result<Vec<SourceConfig>, SyncError> {
    let file: SourcesFile =
        serde_json::from_str(raw).map_err(|e| SyncError::Config(format!("invalid JSON: {e}")))?;

    let mut names = HashSet::new();
    for source in &file.sources {
        if source.name.trim().is_empty() {
            return Err(SyncError::Config("source name must not be empty".to_string()));
        }
        if source.event.trim().is_empty() {
            return Err(SyncError::Config(format!(
                "source {} has an empty event name",
                source.name
            )));
        }
        if !names.insert(source.name.as_str()) {
            return Err(SyncError::Config(format!(
                "duplicate source name: {}",
                source.name
            )));
        }
    }
    Ok(file.sources)
}

/// A fetched sheet: header row plus data rows, all cells as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    /// Header cells.
    pub headers: Vec<String>,
    /// Data rows (may be ragged).
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// Splits raw values into header and data rows.
    #[must_use]
    pub fn from_values(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let rest = values.split_off(1);
        let headers = values.pop().unwrap_or_default();
        Self {
            headers,
            rows: rest,
        }
    }
}

/// Read-only tabular fetch from an external spreadsheet service.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Fetches the sheet described by `source`.
    async fn fetch(&self, source: &SourceConfig) -> Result<SheetTable, SourceError>;
}

/// In-memory sheets keyed by source name, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct StaticSheetSource {
    tables: HashMap<String, SheetTable>,
}

impl StaticSheetSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sheet from raw values (first row is the header).
    #[must_use]
    pub fn with_sheet(mut self, name: impl Into<String>, values: &[&[&str]]) -> Self {
        self.insert(name, values);
        self
    }

    /// Registers or replaces a sheet from raw values.
    pub fn insert(&mut self, name: impl Into<String>, values: &[&[&str]]) {
        let values = values
            .iter()
            .map(|row| row.iter().map(|c| (*c).to_string()).collect())
            .collect();
        self.tables.insert(name.into(), SheetTable::from_values(values));
    }
}

#[async_trait]
impl SheetSource for StaticSheetSource {
    async fn fetch(&self, source: &SourceConfig) -> Result<SheetTable, SourceError> {
        self.tables
            .get(&source.name)
            .cloned()
            .ok_or_else(|| SourceError::SheetNotFound {
                name: source.name.clone(),
            })
    }
}
