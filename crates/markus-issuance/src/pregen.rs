//! Bulk pre-generation of pending certificates.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::coordinator::{IssuanceCoordinator, Issued};
use crate::error::IssueError;

/// Counts from one pre-generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PregenReport {
    /// Certificates rendered and uploaded by this run.
    pub generated: usize,
    /// Pairs already issued, claimed elsewhere, or withheld.
    pub skipped: usize,
    /// Pairs whose generation failed.
    pub failed: usize,
}

/// Issues every pending `(roll_no, event)` pair, optionally limited to one
/// event, with at most `concurrency` issuances in flight.
///
/// Each pair goes through [`IssuanceCoordinator::issue`], so the claim
/// protocol holds against concurrent web requests.
///
/// # Errors
///
/// Returns an error only if the pending list cannot be read; individual
/// failures are counted.
pub async fn pregenerate(
    coordinator: &IssuanceCoordinator,
    event: Option<&str>,
    concurrency: usize,
) -> Result<PregenReport, IssueError> {
    let filter = event.map(str::to_string);
    let pending = coordinator
        .store()
        .run(move |store| store.list_pending(filter.as_deref()))
        .await?;

    // Leader and member rows of the same person share one certificate.
    let pairs: BTreeSet<(String, String)> = pending
        .into_iter()
        .map(|record| (record.roll_no, record.event))
        .collect();
    info!(pairs = pairs.len(), concurrency, "starting pre-generation");

    let outcomes: Vec<Result<Issued, IssueError>> = stream::iter(pairs)
        .map(|(roll_no, event)| async move {
            let outcome = coordinator.issue(&roll_no, &event).await;
            if let Err(err) = &outcome {
                if err.is_internal() {
                    warn!(%roll_no, %event, error = %err, "pre-generation failed");
                }
            }
            outcome
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let report = outcomes
        .iter()
        .fold(PregenReport::default(), |mut report, outcome| {
            match outcome {
                Ok(Issued::Generated(_)) => report.generated += 1,
                Ok(_) => report.skipped += 1,
                Err(err) if err.is_internal() => report.failed += 1,
                Err(_) => report.skipped += 1,
            }
            report
        });
    info!(
        generated = report.generated,
        skipped = report.skipped,
        failed = report.failed,
        "pre-generation finished"
    );
    Ok(report)
}
