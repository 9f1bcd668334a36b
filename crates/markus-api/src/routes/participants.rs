//! Participant verification routes.
//!
//! ## Routes
//!
//! - `GET /participants/{roll_no}` - Events a participant can claim a certificate for

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use markus_core::participant::ParticipantRecord;
use markus_core::roll::{display_event_name, is_acceptable_roll, normalize_roll};

use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// An event the participant is eligible for.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct EligibleEvent {
    /// Event key, used in the certificate URL.
    pub event: String,
    /// Cleaned event title for display.
    pub display_name: String,
    /// Department as registered.
    pub department: String,
    /// Year of study.
    pub year: String,
    /// `leader` or `member`.
    pub role: String,
    /// True once a certificate has been issued.
    pub issued: bool,
}

impl From<ParticipantRecord> for EligibleEvent {
    fn from(record: ParticipantRecord) -> Self {
        Self {
            display_name: display_event_name(&record.event),
            issued: record.is_issued(),
            role: record.member_role.as_str().to_string(),
            event: record.event,
            department: record.department,
            year: record.year,
        }
    }
}

/// Verification response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct VerifyResponse {
    /// Normalized roll number.
    pub roll_no: String,
    /// Participant name.
    pub name: String,
    /// Eligible events, one per event.
    pub events: Vec<EligibleEvent>,
}

/// Creates participant routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/participants/:roll_no", get(verify_participant))
}

/// Verify a participant.
///
/// GET /api/v1/participants/{roll_no}
#[utoipa::path(
    get,
    path = "/api/v1/participants/{roll_no}",
    tag = "participants",
    params(("roll_no" = String, Path, description = "Roll number, any case")),
    responses(
        (status = 200, description = "Eligible events", body = VerifyResponse),
        (status = 400, description = "Malformed roll number", body = ApiErrorBody),
        (status = 404, description = "No eligible events", body = ApiErrorBody),
        (status = 503, description = "Under maintenance", body = ApiErrorBody),
    )
)]
pub(crate) async fn verify_participant(
    State(state): State<Arc<AppState>>,
    Path(roll_no): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let roll_no = normalize_roll(&roll_no);
    if !is_acceptable_roll(&roll_no) {
        return Err(ApiError::bad_request("roll number is too short"));
    }

    let lookup = roll_no.clone();
    let records = state
        .store
        .run(move |store| store.find_for_roll(&lookup))
        .await?;
    let Some(first) = records.first() else {
        return Err(ApiError::not_found(format!(
            "no eligible events for {roll_no}"
        )));
    };

    let name = first.name.clone();
    tracing::info!(%roll_no, events = records.len(), "participant verified");
    Ok(Json(VerifyResponse {
        roll_no,
        name,
        events: records.into_iter().map(EligibleEvent::from).collect(),
    }))
}
