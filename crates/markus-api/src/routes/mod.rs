//! HTTP route handlers.

pub mod admin;
pub mod certificates;
pub mod participants;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// `/api/v1` routes. Admin handlers authenticate through their extractor.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(participants::routes())
        .merge(certificates::routes())
        .merge(admin::routes())
}
