//! Admin routes.
//!
//! Everything except login requires an [`AdminSession`].
//!
//! ## Routes
//!
//! - `POST   /admin/login` - Exchange the admin password for a session
//! - `POST   /admin/logout` - Revoke the current session
//! - `GET    /admin/records` - List records, optionally filtered
//! - `GET    /admin/stats` - Per-event issuance totals and department breakdown
//! - `PUT    /admin/records/{id}/visibility` - Block or unblock a record
//! - `DELETE /admin/records/{id}/certificate` - Clear a stored certificate URL
//! - `GET    /admin/maintenance` - Read the maintenance flag
//! - `PUT    /admin/maintenance` - Set the maintenance flag
//! - `POST   /admin/sync` - Start a spreadsheet sync in the background
//! - `GET    /admin/sync` - Active and last sync run

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use markus_core::participant::{DepartmentStats, EventStats, ParticipantRecord, RecordFilter};
use markus_core::roll::normalize_roll;
use markus_sync::synchronizer::{SourceOutcome, SourceReport};

use crate::context::{AdminSession, expired_session_cookie, session_cookie};
use crate::error::{ApiError, ApiErrorBody};
use crate::metrics::record_login_failure;
use crate::server::AppState;
use crate::session::password_matches;
use crate::sync_jobs::{FinishedSync, SyncStart};

// ============================================================================
// Request / response types
// ============================================================================

/// Admin login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Admin password.
    pub password: String,
}

/// Admin login response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct LoginResponse {
    /// Opaque session token; send as `Authorization: Bearer <token>`.
    pub token: String,
    /// Expiry timestamp (RFC 3339).
    pub expires_at: String,
}

/// Record filters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    /// Only records of this event.
    pub event: Option<String>,
    /// Only records of this roll number (any case).
    pub roll_no: Option<String>,
}

/// A participant record as seen by administrators.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct RecordResponse {
    /// Record ID.
    pub id: i64,
    /// Roll number.
    pub roll_no: String,
    /// Participant name.
    pub name: String,
    /// Department.
    pub department: String,
    /// Year of study.
    pub year: String,
    /// Event key.
    pub event: String,
    /// Sheet the record came from.
    pub source: String,
    /// Certificate URL, once issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_url: Option<String>,
    /// `unissued`, `claimed`, `issued` or `suppressed`.
    pub state: String,
    /// Administrative block flag.
    pub blocked: bool,
    /// `leader` or `member`.
    pub role: String,
    /// Roll number of the team leader, for members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader_roll_no: Option<String>,
    /// 1-based position within the team; 0 for leaders.
    pub member_position: u32,
    /// Last update timestamp (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<ParticipantRecord> for RecordResponse {
    fn from(record: ParticipantRecord) -> Self {
        Self {
            state: record.state().as_str().to_string(),
            role: record.member_role.as_str().to_string(),
            updated_at: record.updated_at.map(|ts| ts.to_rfc3339()),
            id: record.id,
            roll_no: record.roll_no,
            name: record.name,
            department: record.department,
            year: record.year,
            event: record.event,
            source: record.source,
            cert_url: record.cert_url,
            blocked: record.blocked,
            leader_roll_no: record.leader_roll_no,
            member_position: record.member_position,
        }
    }
}

/// List records response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct ListRecordsResponse {
    /// Matching records.
    pub records: Vec<RecordResponse>,
}

/// Totals for one event.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct EventStatsResponse {
    /// Event key.
    pub event: String,
    /// Number of records.
    pub records: u64,
    /// Records with a certificate.
    pub issued: u64,
    /// Blocked records.
    pub blocked: u64,
    /// Eligible records without a certificate.
    pub pending: u64,
}

impl From<EventStats> for EventStatsResponse {
    fn from(stats: EventStats) -> Self {
        Self {
            event: stats.event,
            records: stats.records,
            issued: stats.issued,
            blocked: stats.blocked,
            pending: stats.pending,
        }
    }
}

/// Unique participants in one department.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct DepartmentStatsResponse {
    /// Canonical department name.
    pub department: String,
    /// Unique roll numbers.
    pub participants: u64,
    /// Share of all unique participants, rounded to one decimal.
    pub percentage: f64,
}

impl DepartmentStatsResponse {
    #[allow(clippy::cast_precision_loss)]
    fn from_stats(stats: DepartmentStats, total: u64) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (stats.participants as f64 * 1000.0 / total as f64).round() / 10.0
        };
        Self {
            department: stats.department,
            participants: stats.participants,
            percentage,
        }
    }
}

/// Stats response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct StatsResponse {
    /// One entry per event.
    pub events: Vec<EventStatsResponse>,
    /// Sum over all events.
    pub totals: EventStatsResponse,
    /// Distinct roll numbers across all events.
    pub unique_participants: u64,
    /// Unique participants per department, largest first.
    pub departments: Vec<DepartmentStatsResponse>,
}

/// Visibility update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VisibilityRequest {
    /// `false` blocks issuance, `true` re-enables it.
    pub visible: bool,
}

/// Maintenance flag.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceState {
    /// True while the public endpoints answer 503.
    pub enabled: bool,
}

/// Sync trigger response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct SyncAcceptedResponse {
    /// `started` or `already_running`.
    pub status: String,
    /// Identifier of the started or active run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

/// Per-source result of a sync run.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct SyncSourceResponse {
    /// Source name.
    pub name: String,
    /// Event key.
    pub event: String,
    /// `synced` or `failed`.
    pub status: String,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Data rows read.
    pub rows_seen: usize,
    /// Leader records written.
    pub leaders: usize,
    /// Member records written.
    pub members: usize,
    /// Rows skipped for a bad roll number.
    pub skipped_rows: usize,
    /// Member slots rejected.
    pub rejected_members: usize,
}

impl From<SourceReport> for SyncSourceResponse {
    fn from(report: SourceReport) -> Self {
        let (status, error, stats) = match report.outcome {
            SourceOutcome::Synced(stats) => ("synced", None, stats),
            SourceOutcome::Failed { error } => ("failed", Some(error), Default::default()),
        };
        Self {
            name: report.name,
            event: report.event,
            status: status.to_string(),
            error,
            rows_seen: stats.rows_seen,
            leaders: stats.leaders,
            members: stats.members,
            skipped_rows: stats.skipped_rows,
            rejected_members: stats.rejected_members,
        }
    }
}

/// A finished sync run.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct SyncRunResponse {
    /// Run identifier.
    pub run_id: String,
    /// Start timestamp (RFC 3339).
    pub started_at: String,
    /// End timestamp (RFC 3339).
    pub finished_at: String,
    /// One entry per source, in order.
    pub sources: Vec<SyncSourceResponse>,
}

impl From<FinishedSync> for SyncRunResponse {
    fn from(run: FinishedSync) -> Self {
        Self {
            run_id: run.run_id,
            started_at: run.report.started_at.to_rfc3339(),
            finished_at: run.report.finished_at.to_rfc3339(),
            sources: run
                .report
                .sources
                .into_iter()
                .map(SyncSourceResponse::from)
                .collect(),
        }
    }
}

/// Sync status response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct SyncStatusResponse {
    /// True if sync sources are configured.
    pub enabled: bool,
    /// Identifier of the active run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<String>,
    /// Most recent finished run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<SyncRunResponse>,
}

// ============================================================================
// Routes
// ============================================================================

/// Creates admin routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/records", get(list_records))
        .route("/admin/stats", get(stats))
        .route("/admin/records/:id/visibility", put(set_visibility))
        .route("/admin/records/:id/certificate", delete(reset_certificate))
        .route("/admin/maintenance", get(get_maintenance).put(set_maintenance))
        .route("/admin/sync", post(trigger_sync).get(sync_status))
}

/// Admin login.
///
/// POST /api/v1/admin/login
#[utoipa::path(
    post,
    path = "/api/v1/admin/login",
    tag = "admin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created", body = LoginResponse),
        (status = 401, description = "Wrong password", body = ApiErrorBody),
        (status = 403, description = "Admin login disabled", body = ApiErrorBody),
    )
)]
pub(crate) async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(expected) = state.config.admin_password.as_deref() else {
        return Err(ApiError::forbidden("admin login is disabled"));
    };
    if !password_matches(expected, &req.password) {
        record_login_failure();
        tracing::warn!("rejected admin login");
        return Err(ApiError::unauthorized("invalid password"));
    }

    let session = state.sessions.create();
    tracing::info!(expires_at = %session.expires_at, "admin session created");
    let cookie = session_cookie(&session.token, state.config.session_ttl_secs);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token: session.token,
            expires_at: session.expires_at.to_rfc3339(),
        }),
    ))
}

/// Admin logout.
///
/// POST /api/v1/admin/logout
#[utoipa::path(
    post,
    path = "/api/v1/admin/logout",
    tag = "admin",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "No valid session", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn logout(
    session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state.sessions.revoke(&session.token);
    tracing::info!("admin session revoked");
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    )
}

/// List records.
///
/// GET /api/v1/admin/records
#[utoipa::path(
    get,
    path = "/api/v1/admin/records",
    tag = "admin",
    params(RecordQuery),
    responses(
        (status = 200, description = "Matching records", body = ListRecordsResponse),
        (status = 401, description = "No valid session", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn list_records(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = RecordFilter {
        event: query
            .event
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
        roll_no: query
            .roll_no
            .map(|r| normalize_roll(&r))
            .filter(|r| !r.is_empty()),
    };
    let records = state
        .store
        .run(move |store| store.list_records(&filter))
        .await?;
    Ok(Json(ListRecordsResponse {
        records: records.into_iter().map(RecordResponse::from).collect(),
    }))
}

/// Per-event totals and the department breakdown.
///
/// GET /api/v1/admin/stats
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "admin",
    responses(
        (status = 200, description = "Issuance totals", body = StatsResponse),
        (status = 401, description = "No valid session", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn stats(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (events, departments) = state
        .store
        .run(|store| Ok((store.event_stats()?, store.department_breakdown()?)))
        .await?;
    let totals = events.iter().fold(
        EventStatsResponse {
            event: "*".to_string(),
            records: 0,
            issued: 0,
            blocked: 0,
            pending: 0,
        },
        |mut acc, s| {
            acc.records += s.records;
            acc.issued += s.issued;
            acc.blocked += s.blocked;
            acc.pending += s.pending;
            acc
        },
    );
    let unique_participants = departments.iter().map(|d| d.participants).sum();
    Ok(Json(StatsResponse {
        events: events.into_iter().map(EventStatsResponse::from).collect(),
        totals,
        unique_participants,
        departments: departments
            .into_iter()
            .map(|d| DepartmentStatsResponse::from_stats(d, unique_participants))
            .collect(),
    }))
}

/// Block or unblock a record.
///
/// PUT /api/v1/admin/records/{id}/visibility
#[utoipa::path(
    put,
    path = "/api/v1/admin/records/{id}/visibility",
    tag = "admin",
    params(("id" = i64, Path, description = "Record ID")),
    request_body = VisibilityRequest,
    responses(
        (status = 200, description = "Updated record", body = RecordResponse),
        (status = 401, description = "No valid session", body = ApiErrorBody),
        (status = 404, description = "Record not found", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn set_visibility(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<VisibilityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let blocked = !req.visible;
    let record = state
        .store
        .run(move |store| store.set_blocked(id, blocked))
        .await?;
    tracing::info!(record_id = id, roll_no = %record.roll_no, event = %record.event, blocked, "record visibility changed");
    Ok(Json(RecordResponse::from(record)))
}

/// Clear a stored certificate.
///
/// DELETE /api/v1/admin/records/{id}/certificate
///
/// The next request for the pair generates a fresh certificate.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/records/{id}/certificate",
    tag = "admin",
    params(("id" = i64, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Updated record", body = RecordResponse),
        (status = 401, description = "No valid session", body = ApiErrorBody),
        (status = 404, description = "Record not found", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn reset_certificate(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .store
        .run(move |store| store.reset_certificate(id))
        .await?;
    tracing::info!(record_id = id, roll_no = %record.roll_no, event = %record.event, "certificate reset");
    Ok(Json(RecordResponse::from(record)))
}

/// Read the maintenance flag.
///
/// GET /api/v1/admin/maintenance
#[utoipa::path(
    get,
    path = "/api/v1/admin/maintenance",
    tag = "admin",
    responses(
        (status = 200, description = "Current flag", body = MaintenanceState),
        (status = 401, description = "No valid session", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn get_maintenance(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let enabled = state.store.run(|store| store.maintenance()).await?;
    Ok(Json(MaintenanceState { enabled }))
}

/// Set the maintenance flag.
///
/// PUT /api/v1/admin/maintenance
#[utoipa::path(
    put,
    path = "/api/v1/admin/maintenance",
    tag = "admin",
    request_body = MaintenanceState,
    responses(
        (status = 200, description = "Flag updated", body = MaintenanceState),
        (status = 401, description = "No valid session", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn set_maintenance(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Json(req): Json<MaintenanceState>,
) -> Result<impl IntoResponse, ApiError> {
    let enabled = req.enabled;
    state
        .store
        .run(move |store| store.set_maintenance(enabled))
        .await?;
    tracing::warn!(enabled, "maintenance mode changed");
    Ok(Json(MaintenanceState { enabled }))
}

/// Start a sync run.
///
/// POST /api/v1/admin/sync
#[utoipa::path(
    post,
    path = "/api/v1/admin/sync",
    tag = "admin",
    responses(
        (status = 202, description = "Run started or already running", body = SyncAcceptedResponse),
        (status = 401, description = "No valid session", body = ApiErrorBody),
        (status = 503, description = "No sync sources configured", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn trigger_sync(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (status, run_id) = match state.sync.start() {
        SyncStart::Started { run_id } => ("started", Some(run_id)),
        SyncStart::AlreadyRunning { run_id } => ("already_running", run_id),
        SyncStart::Disabled => {
            return Err(ApiError::unavailable("no spreadsheet sources configured"));
        }
    };
    Ok((
        StatusCode::ACCEPTED,
        Json(SyncAcceptedResponse {
            status: status.to_string(),
            run_id,
        }),
    ))
}

/// Sync status.
///
/// GET /api/v1/admin/sync
#[utoipa::path(
    get,
    path = "/api/v1/admin/sync",
    tag = "admin",
    responses(
        (status = 200, description = "Active and last run", body = SyncStatusResponse),
        (status = 401, description = "No valid session", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn sync_status(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(SyncStatusResponse {
        enabled: state.sync.enabled(),
        running: state.sync.current(),
        last_run: state.sync.last().map(SyncRunResponse::from),
    })
}
