//! The sync pass: fetch every source, detect columns, upsert rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Instrument, info, warn};

use markus_core::observability::sync_span;
use markus_core::participant::TeamEntry;
use markus_core::store::ParticipantStore;

use crate::columns::detect_columns;
use crate::error::SyncError;
use crate::rows::{RowDecision, read_row};
use crate::source::{SheetSource, SourceConfig};

/// Counters for one successfully synchronized source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    /// Data rows read from the sheet.
    pub rows_seen: usize,
    /// Leader records written (inserted or updated).
    pub leaders: usize,
    /// Leader records created by this pass.
    pub leaders_inserted: usize,
    /// Member records written.
    pub members: usize,
    /// Rows skipped for a missing or short roll number.
    pub skipped_rows: usize,
    /// Member slots that were filled in but rejected.
    pub rejected_members: usize,
}

/// How one source fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// The source was read and written.
    Synced(SourceStats),
    /// The source was skipped after an error.
    Failed {
        /// Error message.
        error: String,
    },
}

/// Per-source entry of a [`SyncReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    /// Source name.
    pub name: String,
    /// Event the source registers for.
    pub event: String,
    /// Outcome.
    pub outcome: SourceOutcome,
}

/// Summary of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// When the pass finished.
    pub finished_at: DateTime<Utc>,
    /// One entry per configured source, in order.
    pub sources: Vec<SourceReport>,
}

impl SyncReport {
    /// Number of sources that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Failed { .. }))
            .count()
    }

    /// Sum of the stats of every synced source.
    #[must_use]
    pub fn totals(&self) -> SourceStats {
        self.sources
            .iter()
            .filter_map(|s| match s.outcome {
                SourceOutcome::Synced(stats) => Some(stats),
                SourceOutcome::Failed { .. } => None,
            })
            .fold(SourceStats::default(), |acc, s| SourceStats {
                rows_seen: acc.rows_seen + s.rows_seen,
                leaders: acc.leaders + s.leaders,
                leaders_inserted: acc.leaders_inserted + s.leaders_inserted,
                members: acc.members + s.members,
                skipped_rows: acc.skipped_rows + s.skipped_rows,
                rejected_members: acc.rejected_members + s.rejected_members,
            })
    }
}

/// Runs sync passes over a fixed list of sources.
#[derive(Clone)]
pub struct Synchronizer {
    store: ParticipantStore,
    fetcher: Arc<dyn SheetSource>,
    sources: Vec<SourceConfig>,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("store", &self.store)
            .field("sources", &self.sources.len())
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Creates a synchronizer.
    #[must_use]
    pub fn new(
        store: ParticipantStore,
        fetcher: Arc<dyn SheetSource>,
        sources: Vec<SourceConfig>,
    ) -> Self {
        Self {
            store,
            fetcher,
            sources,
        }
    }

    /// Configured sources.
    #[must_use]
    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Runs one pass over every source. Never fails as a whole: a failing
    /// source is logged, reported and skipped.
    pub async fn run(&self) -> SyncReport {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let outcome = match self
                .sync_source(source)
                .instrument(sync_span(&source.name, &source.event))
                .await
            {
                Ok(stats) => SourceOutcome::Synced(stats),
                Err(err) => {
                    warn!(source = %source.name, error = %err, "source sync failed; skipping");
                    SourceOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            };
            reports.push(SourceReport {
                name: source.name.clone(),
                event: source.event.clone(),
                outcome,
            });
        }

        let report = SyncReport {
            started_at,
            finished_at: Utc::now(),
            sources: reports,
        };
        let totals = report.totals();
        info!(
            sources = report.sources.len(),
            failed = report.failed_count(),
            leaders = totals.leaders,
            members = totals.members,
            "sync pass finished"
        );
        report
    }

    /// Synchronizes a single source.
    ///
    /// # Errors
    ///
    /// Returns an error if the sheet cannot be fetched, has no roll column,
    /// or a store write fails. Rows written before a store failure stay
    /// written.
    pub async fn sync_source(&self, source: &SourceConfig) -> Result<SourceStats, SyncError> {
        let table = self.fetcher.fetch(source).await?;
        let layout =
            detect_columns(&table.headers, &source.columns).ok_or_else(|| {
                SyncError::MissingColumn {
                    source_name: source.name.clone(),
                    column: "roll",
                }
            })?;

        let mut stats = SourceStats {
            rows_seen: table.rows.len(),
            ..SourceStats::default()
        };
        let mut entries: Vec<TeamEntry> = Vec::new();
        for row in &table.rows {
            match read_row(row, &layout, &source.event, &source.name) {
                RowDecision::Accepted { entry, rejected } => {
                    stats.rejected_members += rejected.len();
                    entries.push(entry);
                }
                RowDecision::Skipped(_) => stats.skipped_rows += 1,
            }
        }

        let (leaders_inserted, members) = self
            .store
            .run(move |store| {
                let mut inserted = 0;
                let mut members = 0;
                for entry in &entries {
                    let outcome = store.sync_team(entry)?;
                    if outcome.leader_inserted {
                        inserted += 1;
                    }
                    members += outcome.members_written;
                }
                Ok((inserted, members))
            })
            .await?;

        stats.leaders = stats.rows_seen - stats.skipped_rows;
        stats.leaders_inserted = leaders_inserted;
        stats.members = members;
        info!(
            rows = stats.rows_seen,
            leaders = stats.leaders,
            members = stats.members,
            skipped = stats.skipped_rows,
            rejected = stats.rejected_members,
            "source synchronized"
        );
        Ok(stats)
    }
}
