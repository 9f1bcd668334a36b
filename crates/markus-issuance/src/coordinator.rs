//! Race-safe, at-most-once certificate issuance.
//!
//! ## Protocol
//!
//! 1. Look up the record for `(roll_no, event)`. Missing means
//!    [`IssueError::NotFound`]; blocked means [`IssueError::Suppressed`],
//!    even when a URL already exists.
//! 2. A stored URL is returned as-is.
//! 3. Otherwise try to claim the record with a guarded update on its
//!    `generating` flag. Exactly one caller wins.
//! 4. The winner renders, uploads, persists the URL and releases the claim.
//!    This runs in a spawned task, so a caller that goes away does not
//!    cancel it, and a [`ClaimGuard`] releases the claim if the task is torn
//!    down early.
//! 5. Losers poll the store until the URL appears, the claim is released
//!    without one, or the attempts run out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, info, warn};

use markus_core::observability::issuance_span;
use markus_core::participant::ParticipantRecord;
use markus_core::roll::normalize_roll;
use markus_core::store::ParticipantStore;
use markus_core::upload::UploadGateway;

use crate::error::IssueError;
use crate::renderer::{ArtifactRenderer, CertificateRequest};

/// Polling and back-off settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuancePolicy {
    /// Delay between loser polls.
    pub poll_interval: Duration,
    /// Number of polls before giving up.
    pub max_attempts: u32,
    /// Back-off suggested to clients on [`IssueError::InProgress`].
    pub retry_after: Duration,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 15,
            retry_after: Duration::from_secs(5),
        }
    }
}

/// A successful issuance and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issued {
    /// The URL was already stored.
    Existing(String),
    /// This call rendered and uploaded the certificate.
    Generated(String),
    /// Another caller generated it while this one waited.
    Awaited(String),
}

impl Issued {
    /// The certificate URL.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Existing(url) | Self::Generated(url) | Self::Awaited(url) => url,
        }
    }

    /// Consumes the outcome, returning the URL.
    #[must_use]
    pub fn into_url(self) -> String {
        match self {
            Self::Existing(url) | Self::Generated(url) | Self::Awaited(url) => url,
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Existing(_) => "existing",
            Self::Generated(_) => "generated",
            Self::Awaited(_) => "awaited",
        }
    }
}

/// Releases a generation claim.
///
/// Call [`ClaimGuard::release`] explicitly. If the guard is dropped without
/// it (task aborted, panic), a best-effort release is spawned on the current
/// runtime; without a runtime the startup sweep clears the flag instead.
#[derive(Debug)]
pub struct ClaimGuard {
    store: ParticipantStore,
    id: i64,
    released: bool,
}

impl ClaimGuard {
    fn new(store: ParticipantStore, id: i64) -> Self {
        Self {
            store,
            id,
            released: false,
        }
    }

    /// Clears the claim flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the store update fails.
    pub async fn release(mut self) -> Result<(), IssueError> {
        self.released = true;
        let id = self.id;
        self.store.run(move |store| store.release_claim(id)).await?;
        Ok(())
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let store = self.store.clone();
        let id = self.id;
        warn!(record_id = id, "claim dropped without release; releasing in background");
        handle.spawn_blocking(move || {
            if let Err(err) = store.release_claim(id) {
                warn!(record_id = id, error = %err, "background claim release failed");
            }
        });
    }
}

/// Coordinates certificate issuance over the participant store.
#[derive(Clone)]
pub struct IssuanceCoordinator {
    store: ParticipantStore,
    renderer: Arc<dyn ArtifactRenderer>,
    uploader: Arc<dyn UploadGateway>,
    policy: IssuancePolicy,
}

impl std::fmt::Debug for IssuanceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceCoordinator")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl IssuanceCoordinator {
    /// Creates a coordinator with the default policy.
    #[must_use]
    pub fn new(
        store: ParticipantStore,
        renderer: Arc<dyn ArtifactRenderer>,
        uploader: Arc<dyn UploadGateway>,
    ) -> Self {
        Self {
            store,
            renderer,
            uploader,
            policy: IssuancePolicy::default(),
        }
    }

    /// Replaces the polling policy.
    #[must_use]
    pub fn with_policy(mut self, policy: IssuancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> IssuancePolicy {
        self.policy
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &ParticipantStore {
        &self.store
    }

    /// Issues the certificate for `(roll_no, event)`.
    ///
    /// # Errors
    ///
    /// See [`IssueError`] for the outcome taxonomy.
    pub async fn issue(&self, roll_no: &str, event: &str) -> Result<Issued, IssueError> {
        let roll_no = normalize_roll(roll_no);
        let event = event.trim().to_string();
        let span = issuance_span(&roll_no, &event);
        let result = self.issue_inner(roll_no, event).instrument(span).await;
        match &result {
            Ok(issued) => {
                metrics::counter!("markus_issuance_total", "outcome" => issued.kind()).increment(1);
            }
            Err(err) => {
                metrics::counter!("markus_issuance_total", "outcome" => error_label(err))
                    .increment(1);
            }
        }
        result
    }

    async fn issue_inner(&self, roll_no: String, event: String) -> Result<Issued, IssueError> {
        let record = self.lookup(&roll_no, &event).await?;
        if record.blocked {
            return Err(IssueError::Suppressed { roll_no, event });
        }
        if let Some(url) = record.cert_url {
            return Ok(Issued::Existing(url));
        }

        let id = record.id;
        let won = self.store.run(move |store| store.try_claim(id)).await?;
        if !won {
            debug!(record_id = id, "claim held elsewhere; waiting");
            return self.wait_for_url(roll_no, event).await;
        }

        info!(record_id = id, "claim won; generating certificate");
        let worker = self.clone();
        let handle = tokio::spawn(
            async move { worker.generate(record).await }.instrument(tracing::Span::current()),
        );
        match handle.await {
            Ok(result) => result.map(Issued::Generated),
            Err(err) => Err(IssueError::Task(err.to_string())),
        }
    }

    async fn lookup(&self, roll_no: &str, event: &str) -> Result<ParticipantRecord, IssueError> {
        let (roll, ev) = (roll_no.to_string(), event.to_string());
        self.store
            .run(move |store| store.find_record(&roll, &ev))
            .await?
            .ok_or_else(|| IssueError::NotFound {
                roll_no: roll_no.to_string(),
                event: event.to_string(),
            })
    }

    /// Winner path. Holds the claim for its whole duration.
    async fn generate(&self, record: ParticipantRecord) -> Result<String, IssueError> {
        let guard = ClaimGuard::new(self.store.clone(), record.id);
        let result = self.render_and_upload(&record).await;
        if let Err(err) = &result {
            warn!(record_id = record.id, error = %err, "certificate generation failed");
        }
        if let Err(err) = guard.release().await {
            warn!(record_id = record.id, error = %err, "claim release failed");
        }
        result
    }

    async fn render_and_upload(&self, record: &ParticipantRecord) -> Result<String, IssueError> {
        let request = CertificateRequest::from_record(record);
        let renderer = Arc::clone(&self.renderer);
        let path: PathBuf = tokio::task::spawn_blocking(move || renderer.render(&request))
            .await
            .map_err(|e| IssueError::Task(e.to_string()))??;

        let url = self.uploader.upload(&path).await?;

        let (id, roll, event, stored) = (
            record.id,
            record.roll_no.clone(),
            record.event.clone(),
            url.clone(),
        );
        let updated = self
            .store
            .run(move |store| store.complete_claim(id, &roll, &event, &stored))
            .await?;
        info!(record_id = record.id, rows = updated, url = %url, "certificate issued");
        Ok(url)
    }

    /// Loser path.
    async fn wait_for_url(&self, roll_no: String, event: String) -> Result<Issued, IssueError> {
        let in_progress = IssueError::InProgress {
            retry_after: self.policy.retry_after,
        };
        for attempt in 1..=self.policy.max_attempts {
            tokio::time::sleep(self.policy.poll_interval).await;
            let record = self.lookup(&roll_no, &event).await?;
            if record.blocked {
                return Err(IssueError::Suppressed { roll_no, event });
            }
            if let Some(url) = record.cert_url {
                debug!(attempt, "certificate appeared while waiting");
                return Ok(Issued::Awaited(url));
            }
            if !record.generating {
                debug!(attempt, "claim released without a certificate");
                return Err(in_progress);
            }
        }
        debug!(attempts = self.policy.max_attempts, "gave up waiting for claim holder");
        Err(in_progress)
    }
}

fn error_label(err: &IssueError) -> &'static str {
    match err {
        IssueError::NotFound { .. } => "not_found",
        IssueError::Suppressed { .. } => "suppressed",
        IssueError::InProgress { .. } => "in_progress",
        IssueError::Render(_) => "render_error",
        IssueError::Upload(_) => "upload_error",
        IssueError::Store(_) => "store_error",
        IssueError::Task(_) => "task_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_exposes_url_and_kind() {
        let issued = Issued::Awaited("https://x/y.png".to_string());
        assert_eq!(issued.url(), "https://x/y.png");
        assert_eq!(issued.kind(), "awaited");
        assert_eq!(issued.into_url(), "https://x/y.png");
    }

    #[test]
    fn default_policy_polls_once_per_second_fifteen_times() {
        let policy = IssuancePolicy::default();
        assert_eq!(policy.poll_interval, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 15);
    }

    #[test]
    fn error_labels_are_distinct() {
        let labels = [
            error_label(&IssueError::NotFound {
                roll_no: String::new(),
                event: String::new(),
            }),
            error_label(&IssueError::Suppressed {
                roll_no: String::new(),
                event: String::new(),
            }),
            error_label(&IssueError::InProgress {
                retry_after: Duration::ZERO,
            }),
            error_label(&IssueError::Task(String::new())),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
