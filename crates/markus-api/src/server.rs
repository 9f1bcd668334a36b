//! API server implementation.
//!
//! Provides health, ready, metrics and the `/api/v1` portal endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use markus_core::Result;
use markus_core::store::ParticipantStore;
use markus_core::upload::{MemoryGateway, UploadGateway};
use markus_issuance::coordinator::IssuanceCoordinator;
use markus_issuance::renderer::{ArtifactRenderer, TemplateRenderer};
use markus_sync::synchronizer::Synchronizer;

use crate::config::{Config, CorsConfig};
use crate::session::{MemorySessionStore, SessionStore};
use crate::sync_jobs::SyncJobs;

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Participant store.
    pub store: ParticipantStore,
    /// Certificate issuance.
    pub coordinator: IssuanceCoordinator,
    /// Admin sessions.
    pub sessions: Arc<dyn SessionStore>,
    /// Background sync runs.
    pub sync: Arc<SyncJobs>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("coordinator", &self.coordinator)
            .field("sessions", &"<SessionStore>")
            .field("sync", &self.sync)
            .finish()
    }
}

/// Health check endpoint handler.
///
/// Shallow: does not touch the store.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Ready once the participant store answers a trivial query.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.run(|store| store.ping()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("participant store unavailable: {e}")),
            }),
        ),
    }
}

async fn openapi_document() -> impl IntoResponse {
    Json(crate::openapi::openapi())
}

// ============================================================================
// Server
// ============================================================================

/// The MarkUs API server.
pub struct Server {
    state: Arc<AppState>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("state", &self.state).finish()
    }
}

impl Server {
    /// Creates a new `ServerBuilder` over `store`.
    #[must_use]
    pub fn builder(store: ParticipantStore) -> ServerBuilder {
        ServerBuilder::new(store)
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let state = Arc::clone(&self.state);
        let cors = self.build_cors_layer();

        let maintenance_layer = middleware::from_fn_with_state(
            Arc::clone(&state),
            crate::maintenance::maintenance_gate,
        );
        let metrics_layer = middleware::from_fn(crate::metrics::metrics_middleware);
        let request_id_layer = middleware::from_fn(crate::context::request_id_middleware);

        Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/metrics", get(crate::metrics::serve_metrics))
            .route("/openapi.json", get(openapi_document))
            .nest("/api/v1", crate::routes::api_v1_routes())
            // Middleware (order matters): metrics outermost for timing, then
            // request IDs and trace, then CORS, with the gate innermost.
            .layer(maintenance_layer)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(request_id_layer)
            .layer(metrics_layer)
            .with_state(state)
    }

    fn build_cors_layer(&self) -> CorsLayer {
        let cors_config = &self.state.config.cors;
        let cors = Self::build_cors_base(cors_config);
        Self::apply_cors_allowed_origins(cors, cors_config)
    }

    fn build_cors_base(cors_config: &CorsConfig) -> CorsLayer {
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static("x-request-id"),
            ])
            .expose_headers([
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::LOCATION,
                header::RETRY_AFTER,
                header::HeaderName::from_static("x-request-id"),
            ])
            .max_age(Duration::from_secs(cors_config.max_age_seconds))
    }

    fn cors_allows_any_origin(cors_config: &CorsConfig) -> bool {
        cors_config.allowed_origins.len() == 1
            && cors_config
                .allowed_origins
                .first()
                .is_some_and(|origin| origin == "*")
    }

    fn parse_cors_origins(cors_config: &CorsConfig) -> Vec<HeaderValue> {
        let mut allowed = Vec::new();
        for origin in &cors_config.allowed_origins {
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push(value),
                Err(_) => {
                    tracing::error!(
                        origin = %origin,
                        "Invalid CORS origin; expected a valid HeaderValue"
                    );
                }
            }
        }
        allowed
    }

    fn apply_cors_allowed_origins(cors: CorsLayer, cors_config: &CorsConfig) -> CorsLayer {
        if cors_config.allowed_origins.is_empty() {
            return cors;
        }

        if Self::cors_allows_any_origin(cors_config) {
            return cors.allow_origin(Any);
        }

        if cors_config
            .allowed_origins
            .iter()
            .any(|origin| origin == "*")
        {
            tracing::error!(
                origins = ?cors_config.allowed_origins,
                "Invalid CORS config: '*' must be the only allowed origin"
            );
            return cors;
        }

        let allowed = Self::parse_cors_origins(cors_config);
        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            tracing::info!(origins = ?cors_config.allowed_origins, "CORS configured");
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }

    /// Starts the server and blocks until it exits.
    ///
    /// Claims left over from a previous process are cleared before the
    /// listener binds.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the store cannot be
    /// reached or the listener cannot bind.
    pub async fn serve(&self) -> Result<()> {
        self.state.config.validate()?;

        crate::metrics::init_metrics();

        let released = self
            .state
            .store
            .run(|store| store.release_stale_claims())
            .await
            .map_err(|e| markus_core::Error::internal(format!("startup sweep failed: {e}")))?;
        if released > 0 {
            tracing::warn!(released, "released claims left by a previous process");
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.create_router();

        tracing::info!(
            http_port = self.state.config.http_port,
            database = %self.state.store.path().display(),
            sync_enabled = self.state.sync.enabled(),
            "Starting MarkUs API server"
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| markus_core::Error::internal(format!("failed to bind to {addr}: {e}")))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| markus_core::Error::internal(format!("server error: {e}")))?;

        Ok(())
    }

    /// Builds the router without binding a port, for integration tests.
    #[doc(hidden)]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }
}

/// Builder for constructing a server.
pub struct ServerBuilder {
    config: Config,
    store: ParticipantStore,
    renderer: Option<Arc<dyn ArtifactRenderer>>,
    uploader: Option<Arc<dyn UploadGateway>>,
    sessions: Option<Arc<dyn SessionStore>>,
    synchronizer: Option<Synchronizer>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("renderer", &self.renderer.as_ref().map(|_| "<ArtifactRenderer>"))
            .field("uploader", &self.uploader.as_ref().map(|_| "<UploadGateway>"))
            .field("synchronizer", &self.synchronizer)
            .finish_non_exhaustive()
    }
}

impl ServerBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new(store: ParticipantStore) -> Self {
        Self {
            config: Config::default(),
            store,
            renderer: None,
            uploader: None,
            sessions: None,
            synchronizer: None,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Enables or disables debug mode.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Sets the certificate renderer. Defaults to a [`TemplateRenderer`]
    /// over the configured template, font and output directory.
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn ArtifactRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the upload gateway. Defaults to an in-memory gateway.
    #[must_use]
    pub fn uploader(mut self, uploader: Arc<dyn UploadGateway>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Sets the session store. Defaults to an in-memory store using the
    /// configured session lifetime.
    #[must_use]
    pub fn sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Enables admin-triggered sync with `synchronizer`.
    #[must_use]
    pub fn synchronizer(mut self, synchronizer: Synchronizer) -> Self {
        self.synchronizer = Some(synchronizer);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        let config = self.config;
        let renderer = self.renderer.unwrap_or_else(|| {
            Arc::new(TemplateRenderer::new(
                config.template_path.clone(),
                config.font_path.clone(),
                config.generated_dir.clone(),
            ))
        });
        let uploader = self
            .uploader
            .unwrap_or_else(|| Arc::new(MemoryGateway::new()));
        let sessions = self
            .sessions
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new(config.session_ttl())));
        let coordinator = IssuanceCoordinator::new(self.store.clone(), renderer, uploader)
            .with_policy(config.issuance_policy());

        Server {
            state: Arc::new(AppState {
                config,
                store: self.store,
                coordinator,
                sessions,
                sync: Arc::new(SyncJobs::new(self.synchronizer)),
            }),
        }
    }
}
