//! Background sync runs triggered over HTTP.
//!
//! At most one run is in flight per process. A trigger while a run is active
//! reports the active run instead of starting another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use markus_sync::synchronizer::{SyncReport, Synchronizer};
use ulid::Ulid;

use crate::metrics::record_sync_run;

/// Result of asking for a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStart {
    /// A new run was spawned.
    Started {
        /// Identifier of the new run.
        run_id: String,
    },
    /// A run is already in progress.
    AlreadyRunning {
        /// Identifier of the active run.
        run_id: Option<String>,
    },
    /// No spreadsheet sources are configured.
    Disabled,
}

/// A finished run and its report.
#[derive(Debug, Clone)]
pub struct FinishedSync {
    /// Run identifier.
    pub run_id: String,
    /// Report produced by the run.
    pub report: SyncReport,
}

#[derive(Debug, Default)]
struct Slots {
    current: Option<String>,
    last: Option<FinishedSync>,
}

/// Tracks the active and most recent sync run.
#[derive(Debug)]
pub struct SyncJobs {
    synchronizer: Option<Synchronizer>,
    gate: Arc<tokio::sync::Mutex<()>>,
    slots: Mutex<Slots>,
}

impl SyncJobs {
    /// Creates a tracker. `None` disables triggering.
    #[must_use]
    pub fn new(synchronizer: Option<Synchronizer>) -> Self {
        Self {
            synchronizer,
            gate: Arc::new(tokio::sync::Mutex::new(())),
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Returns true if a synchronizer is configured.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.synchronizer.is_some()
    }

    /// Identifier of the active run, if any.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.slots().current.clone()
    }

    /// The most recent finished run, if any.
    #[must_use]
    pub fn last(&self) -> Option<FinishedSync> {
        self.slots().last.clone()
    }

    /// Spawns a run unless one is active. Must be called within a Tokio
    /// runtime.
    pub fn start(self: &Arc<Self>) -> SyncStart {
        let Some(synchronizer) = self.synchronizer.clone() else {
            return SyncStart::Disabled;
        };
        let Ok(permit) = Arc::clone(&self.gate).try_lock_owned() else {
            return SyncStart::AlreadyRunning {
                run_id: self.current(),
            };
        };

        let run_id = Ulid::new().to_string();
        self.slots().current = Some(run_id.clone());
        tracing::info!(%run_id, sources = synchronizer.sources().len(), "sync run started");

        let jobs = Arc::clone(self);
        let id = run_id.clone();
        tokio::spawn(async move {
            let report = synchronizer.run().await;
            let failed = report.failed_count();
            record_sync_run(if failed == 0 { "completed" } else { "partial" });
            tracing::info!(run_id = %id, failed, "sync run finished");
            {
                let mut slots = jobs.slots();
                slots.current = None;
                slots.last = Some(FinishedSync { run_id: id, report });
            }
            drop(permit);
        });

        SyncStart::Started { run_id }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use markus_core::store::ParticipantStore;
    use markus_sync::source::{SourceConfig, StaticSheetSource};

    use super::*;

    fn jobs(dir: &tempfile::TempDir) -> Arc<SyncJobs> {
        let store = ParticipantStore::open(dir.path().join("participants.db")).unwrap();
        let fetcher = StaticSheetSource::new().with_sheet(
            "sheet",
            &[&["Roll No", "Name"], &["23CS001", "A B"]],
        );
        let synchronizer = Synchronizer::new(
            store,
            Arc::new(fetcher),
            vec![SourceConfig::new("sheet", "EVENT")],
        );
        Arc::new(SyncJobs::new(Some(synchronizer)))
    }

    #[test]
    fn disabled_without_synchronizer() {
        let jobs = Arc::new(SyncJobs::new(None));
        assert!(!jobs.enabled());
        assert_eq!(jobs.start(), SyncStart::Disabled);
    }

    #[tokio::test]
    async fn second_trigger_reports_active_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let jobs = jobs(&dir);
        // Hold the gate so the spawned run cannot finish before the retry.
        let hold = jobs.gate.clone().try_lock_owned().unwrap();
        jobs.slots().current = Some("held".to_string());
        assert_eq!(
            jobs.start(),
            SyncStart::AlreadyRunning {
                run_id: Some("held".to_string())
            }
        );
        drop(hold);
        jobs.slots().current = None;

        let SyncStart::Started { run_id } = jobs.start() else {
            panic!("expected a new run");
        };
        for _ in 0..100 {
            if jobs.last().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let last = jobs.last().unwrap();
        assert_eq!(last.run_id, run_id);
        assert_eq!(last.report.failed_count(), 0);
        assert!(jobs.current().is_none());
    }
}
