//! `OpenAPI` specification generation for `markus-api`.
//!
//! Served at `/openapi.json` for client generation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// `OpenAPI` documentation for the MarkUs REST API (`/api/v1/*`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "MarkUs API",
        description = "Participation certificate verification, issuance and administration"
    ),
    paths(
        crate::routes::participants::verify_participant,
        crate::routes::certificates::issue_certificate,
        crate::routes::admin::login,
        crate::routes::admin::logout,
        crate::routes::admin::list_records,
        crate::routes::admin::stats,
        crate::routes::admin::set_visibility,
        crate::routes::admin::reset_certificate,
        crate::routes::admin::get_maintenance,
        crate::routes::admin::set_maintenance,
        crate::routes::admin::trigger_sync,
        crate::routes::admin::sync_status,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::participants::EligibleEvent,
            crate::routes::participants::VerifyResponse,
            crate::routes::admin::LoginRequest,
            crate::routes::admin::LoginResponse,
            crate::routes::admin::RecordResponse,
            crate::routes::admin::ListRecordsResponse,
            crate::routes::admin::EventStatsResponse,
            crate::routes::admin::DepartmentStatsResponse,
            crate::routes::admin::StatsResponse,
            crate::routes::admin::VisibilityRequest,
            crate::routes::admin::MaintenanceState,
            crate::routes::admin::SyncAcceptedResponse,
            crate::routes::admin::SyncSourceResponse,
            crate::routes::admin::SyncRunResponse,
            crate::routes::admin::SyncStatusResponse,
        )
    ),
    tags(
        (name = "participants", description = "Participant verification"),
        (name = "certificates", description = "Certificate issuance"),
        (name = "admin", description = "Administration"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Returns the generated `OpenAPI` spec serialized as pretty JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen).
pub fn openapi_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&openapi())
}
