//! Metrics middleware and instrumentation for the MarkUs API.
//!
//! HTTP request timing is recorded here. Issuance outcomes are counted by
//! the coordinator under [`ISSUANCE_TOTAL`]; sync runs and rejected admin
//! logins by the helpers at the bottom of this module.

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// ============================================================================
// Metric Names
// ============================================================================

/// HTTP request duration histogram.
pub const HTTP_REQUEST_DURATION: &str = "markus_http_request_duration_seconds";

/// HTTP request counter.
pub const HTTP_REQUEST_TOTAL: &str = "markus_http_request_total";

/// Issuance outcome counter, labelled by `outcome`.
pub const ISSUANCE_TOTAL: &str = "markus_issuance_total";

/// Sync run counter, labelled by `outcome`.
pub const SYNC_RUNS: &str = "markus_sync_runs_total";

/// Failed admin login counter.
pub const ADMIN_LOGIN_FAILURES: &str = "markus_admin_login_failures_total";
const UNMATCHED_ENDPOINT: &str = "unmatched";

// ============================================================================
// Prometheus Recorder
// ============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder once and returns its handle.
///
/// Later calls return the handle installed by the first.
///
/// # Panics
///
/// Panics if the Prometheus recorder cannot be installed. The server does
/// not start without metrics.
#[allow(clippy::panic)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|e| panic!("failed to install prometheus recorder: {e}"));

            describe_histogram!(HTTP_REQUEST_DURATION, "Duration of HTTP requests in seconds");
            describe_counter!(HTTP_REQUEST_TOTAL, "Total number of HTTP requests");
            describe_counter!(ISSUANCE_TOTAL, "Certificate issuance attempts by outcome");
            describe_counter!(SYNC_RUNS, "Spreadsheet sync runs by outcome");
            describe_counter!(ADMIN_LOGIN_FAILURES, "Rejected admin login attempts");

            tracing::info!("metrics recorder installed");
            handle
        })
        .clone()
}

/// The installed handle, or `None` before [`init_metrics`].
#[must_use]
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// ============================================================================
// Metrics Middleware
// ============================================================================

pub(crate) fn endpoint_label<B>(request: &Request<B>) -> String {
    request.extensions().get::<MatchedPath>().map_or_else(
        || UNMATCHED_ENDPOINT.to_string(),
        |path| path.as_str().to_string(),
    )
}

/// Records duration and count for every request.
///
/// Labels use the matched route template, never the raw path, so roll
/// numbers do not become label values.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = endpoint_label(&request);
    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status_class = status_class(response.status());
    let labels = [
        ("endpoint", path.clone()),
        ("method", method.clone()),
        ("status_class", status_class.to_string()),
    ];

    histogram!(HTTP_REQUEST_DURATION, &labels).record(duration);
    counter!(HTTP_REQUEST_TOTAL, &labels).increment(1);

    // Loser polls can legitimately take up to the poll ceiling.
    if duration > 1.0 {
        tracing::warn!(
            endpoint = %path,
            method = %method,
            status = response.status().as_u16(),
            duration_secs = %duration,
            "slow request"
        );
    }

    response
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "unknown",
    }
}

// ============================================================================
// Metrics Endpoint
// ============================================================================

/// `GET /metrics`: Prometheus text exposition.
pub async fn serve_metrics() -> impl IntoResponse {
    prometheus_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain; charset=utf-8")],
                "metrics recorder not installed".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

// ============================================================================
// Domain counters
// ============================================================================

/// Records the end of a sync run.
pub fn record_sync_run(outcome: &'static str) {
    counter!(SYNC_RUNS, "outcome" => outcome).increment(1);
}

/// Records a rejected admin login.
pub fn record_login_failure() {
    counter!(ADMIN_LOGIN_FAILURES).increment(1);
}
