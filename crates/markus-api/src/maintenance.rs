//! Maintenance gate.
//!
//! The flag lives in the participant store so that every server process and
//! the CLI see the same value.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::server::AppState;

/// Paths served even while maintenance mode is on.
const EXEMPT_PATHS: &[&str] = &["/health", "/ready", "/metrics"];

/// Prefix of admin routes, which stay reachable so the flag can be cleared.
const ADMIN_PREFIX: &str = "/api/v1/admin";

/// Returns true if `path` bypasses the maintenance gate.
#[must_use]
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path)
        || path == ADMIN_PREFIX
        || path
            .strip_prefix(ADMIN_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Answers 503 for non-exempt requests while maintenance mode is on.
///
/// A store failure while reading the flag lets the request through; the
/// handler will surface the store problem itself.
pub async fn maintenance_gate(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    match state.store.run(|store| store.maintenance()).await {
        Ok(true) => ApiError::maintenance().into_response(),
        Ok(false) => next.run(req).await,
        Err(err) => {
            tracing::warn!(error = %err, "could not read maintenance flag");
            next.run(req).await
        }
    }
}
