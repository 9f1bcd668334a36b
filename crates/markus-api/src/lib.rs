//! # markus-api
//!
//! HTTP surface of the MarkUs certificate portal.
//!
//! This crate is a thin composition layer: participant lookup, issuance
//! and sync live in `markus-core`, `markus-issuance` and `markus-sync`.
//! It adds:
//!
//! - **Routing**: public verify/issue endpoints and admin controls
//! - **Admin sessions**: password login, opaque bearer tokens
//! - **Maintenance gate**: a store-backed switch for the public endpoints
//! - **Observability**: request IDs, tracing, Prometheus metrics, health checks
//!
//! ## Endpoints
//!
//! ```text
//! GET    /health                                - Health check
//! GET    /ready                                 - Readiness check
//! GET    /metrics                               - Prometheus metrics
//! GET    /openapi.json                          - OpenAPI document
//! GET    /api/v1/participants/{roll}            - Eligible events
//! GET    /api/v1/certificates/{roll}/{event}    - Redirect to certificate
//! POST   /api/v1/admin/login                    - Admin login
//! POST   /api/v1/admin/logout                   - Admin logout
//! GET    /api/v1/admin/records                  - Record listing
//! GET    /api/v1/admin/stats                    - Per-event totals
//! PUT    /api/v1/admin/records/{id}/visibility  - Block / unblock
//! DELETE /api/v1/admin/records/{id}/certificate - Clear certificate URL
//! GET|PUT /api/v1/admin/maintenance             - Maintenance flag
//! GET|POST /api/v1/admin/sync                   - Spreadsheet sync
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use markus_api::server::Server;
//! use markus_core::store::ParticipantStore;
//!
//! let store = ParticipantStore::open("participants.db")?;
//! let server = Server::builder(store).http_port(8000).build();
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod error;
pub mod maintenance;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod session;
pub mod sync_jobs;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::AdminSession;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::{Server, ServerBuilder};
    pub use crate::session::{MemorySessionStore, SessionStore};
}
