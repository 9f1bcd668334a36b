//! Certificate issuance routes.
//!
//! ## Routes
//!
//! - `GET /certificates/{roll_no}/{event}` - Redirect to the certificate,
//!   generating it on first request

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;

use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Creates certificate routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/certificates/:roll_no/:event", get(issue_certificate))
}

/// Issue a certificate.
///
/// GET /api/v1/certificates/{roll_no}/{event}
///
/// The first request for a pair renders and uploads the certificate;
/// concurrent requests wait for it and later ones redirect immediately.
#[utoipa::path(
    get,
    path = "/api/v1/certificates/{roll_no}/{event}",
    tag = "certificates",
    params(
        ("roll_no" = String, Path, description = "Roll number, any case"),
        ("event" = String, Path, description = "Event key"),
    ),
    responses(
        (status = 303, description = "Redirect to the certificate URL"),
        (status = 403, description = "Certificate withheld", body = ApiErrorBody),
        (status = 404, description = "No registration", body = ApiErrorBody),
        (status = 429, description = "Generation in progress; honour Retry-After", body = ApiErrorBody),
        (status = 500, description = "Generation failed", body = ApiErrorBody),
        (status = 503, description = "Under maintenance", body = ApiErrorBody),
    )
)]
pub(crate) async fn issue_certificate(
    State(state): State<Arc<AppState>>,
    Path((roll_no, event)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state.coordinator.issue(&roll_no, &event).await?;
    tracing::info!(%roll_no, %event, outcome = issued.kind(), "certificate served");
    Ok(Redirect::to(issued.url()))
}
