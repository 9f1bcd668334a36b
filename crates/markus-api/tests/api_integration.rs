//! API integration tests.
//!
//! Tests the complete request flow: HTTP → routes → coordinator → store.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use markus_api::config::Config;
use markus_api::server::Server;
use markus_core::participant::{Entrant, TeamEntry};
use markus_core::store::ParticipantStore;
use markus_core::upload::MemoryGateway;
use markus_issuance::error::RenderError;
use markus_issuance::renderer::{ArtifactRenderer, CertificateRequest};
use markus_sync::source::{SourceConfig, StaticSheetSource};
use markus_sync::synchronizer::Synchronizer;

const PASSWORD: &str = "correct horse";
const EVENT: &str = "EVENT";
const QUIZ: &str = "MARKUS 2K26 - QUIZ (Responses)";

/// Writes a small file per request and counts renders.
struct StubRenderer {
    dir: PathBuf,
    renders: AtomicUsize,
    delay: Duration,
}

impl ArtifactRenderer for StubRenderer {
    fn render(&self, request: &CertificateRequest) -> Result<PathBuf, RenderError> {
        std::thread::sleep(self.delay);
        self.renders.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(request.file_name());
        std::fs::write(&path, request.name_line()).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

struct Harness {
    _dir: TempDir,
    store: ParticipantStore,
    renderer: Arc<StubRenderer>,
    router: axum::Router,
}

impl Harness {
    fn renders(&self) -> usize {
        self.renderer.renders.load(Ordering::SeqCst)
    }
}

fn entrant(roll_no: &str, name: &str) -> Entrant {
    Entrant {
        roll_no: roll_no.to_string(),
        name: name.to_string(),
        department: "CSE".to_string(),
        year: "III".to_string(),
    }
}

fn test_config(dir: &TempDir) -> Config {
    Config {
        debug: true,
        admin_password: Some(PASSWORD.to_string()),
        generated_dir: dir.path().join("generated"),
        poll_interval_ms: 10,
        poll_attempts: 200,
        ..Config::default()
    }
}

fn harness_with(
    configure: impl FnOnce(Config) -> Config,
    sheets: Option<StaticSheetSource>,
    render_delay: Duration,
) -> Result<Harness> {
    let dir = TempDir::new().context("tempdir")?;
    let store = ParticipantStore::open(dir.path().join("participants.db")).context("open store")?;
    store.sync_team(&TeamEntry {
        event: EVENT.to_string(),
        source: "sheet".to_string(),
        leader: entrant("23CS001", "A B"),
        members: vec![entrant("23CS002", "C D")],
    })?;
    store.sync_team(&TeamEntry {
        event: QUIZ.to_string(),
        source: "quiz".to_string(),
        leader: entrant("23CS001", "A B"),
        members: Vec::new(),
    })?;

    let renderer = Arc::new(StubRenderer {
        dir: dir.path().to_path_buf(),
        renders: AtomicUsize::new(0),
        delay: render_delay,
    });
    let config = configure(test_config(&dir));
    let mut builder = Server::builder(store.clone())
        .config(config)
        .renderer(renderer.clone())
        .uploader(Arc::new(MemoryGateway::new()));
    if let Some(sheets) = sheets {
        builder = builder.synchronizer(Synchronizer::new(
            store.clone(),
            Arc::new(sheets),
            vec![SourceConfig::new("signups", "WORKSHOP")],
        ));
    }

    Ok(Harness {
        router: builder.build().test_router(),
        _dir: dir,
        store,
        renderer,
    })
}

fn harness() -> Result<Harness> {
    harness_with(|config| config, None, Duration::ZERO)
}

mod helpers {
    use super::*;
    use serde::de::DeserializeOwned;

    pub fn make_request(
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Request<Body>> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match body {
            Some(v) => Body::from(serde_json::to_vec(&v).context("serialize request body")?),
            None => Body::empty(),
        };

        builder.body(body).context("build request")
    }

    pub async fn send(
        router: axum::Router,
        request: Request<Body>,
    ) -> Result<axum::response::Response> {
        let response = router.oneshot(request).await.map_err(|err| -> anyhow::Error { match err {} })?;
        Ok(response)
    }

    pub async fn response_json<T: DeserializeOwned>(
        response: axum::response::Response,
    ) -> Result<(StatusCode, T)> {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .context("read response body")?;
        let json = serde_json::from_slice(&body).with_context(|| {
            format!(
                "parse JSON response (status={status}): {}",
                String::from_utf8_lossy(&body)
            )
        })?;
        Ok((status, json))
    }

    pub async fn call(
        router: &axum::Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let request = make_request(method, uri, token, body)?;
        let response = send(router.clone(), request).await?;
        response_json(response).await
    }

    pub async fn get_json(router: &axum::Router, uri: &str) -> Result<(StatusCode, Value)> {
        call(router, Method::GET, uri, None, None).await
    }

    pub async fn login(router: &axum::Router) -> Result<String> {
        let (status, body) = call(
            router,
            Method::POST,
            "/api/v1/admin/login",
            None,
            Some(json!({ "password": PASSWORD })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("token in login response")
    }

    pub async fn fetch_certificate(
        router: &axum::Router,
        roll_no: &str,
        event: &str,
    ) -> Result<axum::response::Response> {
        let request = make_request(
            Method::GET,
            &format!("/api/v1/certificates/{roll_no}/{event}"),
            None,
            None,
        )?;
        send(router.clone(), request).await
    }

    pub fn location(response: &axum::response::Response) -> Option<String> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

use helpers::{call, fetch_certificate, get_json, location, login};

mod health {
    use super::*;

    #[tokio::test]
    async fn health_and_ready() -> Result<()> {
        let h = harness()?;
        let (status, body) = get_json(&h.router, "/health").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get_json(&h.router, "/ready").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
        Ok(())
    }

    #[tokio::test]
    async fn responses_carry_request_id() -> Result<()> {
        let h = harness()?;
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "req-123")
            .body(Body::empty())
            .context("build request")?;
        let response = helpers::send(h.router.clone(), request).await?;
        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("req-123")
        );
        Ok(())
    }

    #[tokio::test]
    async fn openapi_document_is_served() -> Result<()> {
        let h = harness()?;
        let (status, body) = get_json(&h.router, "/openapi.json").await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/v1/certificates/{roll_no}/{event}"].is_object());
        Ok(())
    }
}

mod verify {
    use super::*;

    #[tokio::test]
    async fn lists_eligible_events_with_display_names() -> Result<()> {
        let h = harness()?;
        let (status, body) = get_json(&h.router, "/api/v1/participants/23cs001").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["roll_no"], "23CS001");
        assert_eq!(body["name"], "A B");

        let events = body["events"].as_array().context("events")?;
        assert_eq!(events.len(), 2);
        let quiz = events
            .iter()
            .find(|e| e["event"] == QUIZ)
            .context("quiz event")?;
        assert_eq!(quiz["display_name"], "QUIZ");
        assert_eq!(quiz["issued"], false);
        assert_eq!(quiz["role"], "leader");
        Ok(())
    }

    #[tokio::test]
    async fn members_see_their_team_event() -> Result<()> {
        let h = harness()?;
        let (status, body) = get_json(&h.router, "/api/v1/participants/23CS002").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["events"][0]["event"], EVENT);
        assert_eq!(body["events"][0]["role"], "member");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_roll_is_404_and_short_roll_is_400() -> Result<()> {
        let h = harness()?;
        let (status, body) = get_json(&h.router, "/api/v1/participants/99XX999").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = get_json(&h.router, "/api/v1/participants/23C").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn blocked_events_are_hidden() -> Result<()> {
        let h = harness()?;
        let record = h.store.find_record("23CS001", QUIZ)?.context("record")?;
        h.store.set_blocked(record.id, true)?;

        let (_, body) = get_json(&h.router, "/api/v1/participants/23CS001").await?;
        let events = body["events"].as_array().context("events")?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"], EVENT);
        Ok(())
    }
}

mod certificates {
    use super::*;

    #[tokio::test]
    async fn first_request_generates_and_redirects() -> Result<()> {
        let h = harness()?;
        let response = fetch_certificate(&h.router, "23cs001", EVENT).await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response).as_deref(),
            Some("memory://23CS001_EVENT")
        );

        let again = fetch_certificate(&h.router, "23CS001", EVENT).await?;
        assert_eq!(again.status(), StatusCode::SEE_OTHER);
        assert_eq!(h.renders(), 1);

        let (_, body) = get_json(&h.router, "/api/v1/participants/23CS001").await?;
        let event = body["events"]
            .as_array()
            .and_then(|events| events.iter().find(|e| e["event"] == EVENT))
            .context("event")?;
        assert_eq!(event["issued"], true);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_render_once() -> Result<()> {
        let h = harness_with(|config| config, None, Duration::from_millis(100))?;

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let router = h.router.clone();
                tokio::spawn(async move { fetch_certificate(&router, "23CS002", EVENT).await })
            })
            .collect();

        for task in tasks {
            let response = task.await.context("join")??;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(
                location(&response).as_deref(),
                Some("memory://23CS002_EVENT")
            );
        }
        assert_eq!(h.renders(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn blocked_record_is_forbidden() -> Result<()> {
        let h = harness()?;
        let record = h.store.find_record("23CS002", EVENT)?.context("record")?;
        h.store.set_blocked(record.id, true)?;

        let response = fetch_certificate(&h.router, "23CS002", EVENT).await?;
        let (status, body): (_, Value) = helpers::response_json(response).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(h.renders(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn verify_and_issue_agree_on_a_partially_blocked_pair() -> Result<()> {
        let h = harness()?;
        // 23CS002 is a member of 23CS001's team and also registered alone.
        let own = h.store.upsert_leader(
            EVENT,
            "solo",
            &Entrant {
                roll_no: "23CS002".to_string(),
                name: "C D".to_string(),
                department: "CSE".to_string(),
                year: "III".to_string(),
            },
        )?;
        h.store.set_blocked(own, true)?;

        let (status, _) = get_json(&h.router, "/api/v1/participants/23CS002").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let response = fetch_certificate(&h.router, "23CS002", EVENT).await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        h.store.set_blocked(own, false)?;
        let (status, body) = get_json(&h.router, "/api/v1/participants/23CS002").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["events"][0]["event"], EVENT);
        let response = fetch_certificate(&h.router, "23CS002", EVENT).await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(h.renders(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_pair_is_not_found() -> Result<()> {
        let h = harness()?;
        let response = fetch_certificate(&h.router, "23CS002", "OTHER").await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn held_claim_answers_429_with_retry_after() -> Result<()> {
        let h = harness_with(
            |config| Config {
                poll_attempts: 3,
                ..config
            },
            None,
            Duration::ZERO,
        )?;
        let record = h.store.find_record("23CS001", EVENT)?.context("record")?;
        assert!(h.store.try_claim(record.id)?);

        let response = fetch_certificate(&h.router, "23CS001", EVENT).await?;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("5")
        );
        assert_eq!(h.renders(), 0);
        Ok(())
    }
}

mod admin {
    use super::*;

    #[tokio::test]
    async fn admin_routes_require_a_session() -> Result<()> {
        let h = harness()?;
        let (status, body) = call(&h.router, Method::GET, "/api/v1/admin/records", None, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "MISSING_SESSION");

        let (status, body) = call(
            &h.router,
            Method::GET,
            "/api/v1/admin/records",
            Some("not-a-token"),
            None,
        )
        .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_SESSION");
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() -> Result<()> {
        let h = harness()?;
        let (status, _) = call(
            &h.router,
            Method::POST,
            "/api/v1/admin/login",
            None,
            Some(json!({ "password": "nope" })),
        )
        .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn login_is_disabled_without_password() -> Result<()> {
        let h = harness_with(
            |config| Config {
                admin_password: None,
                ..config
            },
            None,
            Duration::ZERO,
        )?;
        let (status, _) = call(
            &h.router,
            Method::POST,
            "/api/v1/admin/login",
            None,
            Some(json!({ "password": "" })),
        )
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn cookie_session_works_and_logout_revokes() -> Result<()> {
        let h = harness()?;
        let request = helpers::make_request(
            Method::POST,
            "/api/v1/admin/login",
            None,
            Some(json!({ "password": PASSWORD })),
        )?;
        let response = helpers::send(h.router.clone(), request).await?;
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
            .context("session cookie")?;
        assert!(cookie.starts_with("markus_admin="));
        let token = cookie.trim_start_matches("markus_admin=").to_string();

        let request = Request::builder()
            .uri("/api/v1/admin/stats")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .context("build request")?;
        let response = helpers::send(h.router.clone(), request).await?;
        assert_eq!(response.status(), StatusCode::OK);

        let request = helpers::make_request(Method::POST, "/api/v1/admin/logout", Some(&token), None)?;
        let response = helpers::send(h.router.clone(), request).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let (status, _) = call(&h.router, Method::GET, "/api/v1/admin/stats", Some(&token), None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn records_can_be_filtered() -> Result<()> {
        let h = harness()?;
        let token = login(&h.router).await?;

        let (status, body) = call(
            &h.router,
            Method::GET,
            "/api/v1/admin/records?event=EVENT",
            Some(&token),
            None,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        let records = body["records"].as_array().context("records")?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["roll_no"], "23CS001");
        assert_eq!(records[0]["role"], "leader");
        assert_eq!(records[1]["leader_roll_no"], "23CS001");
        assert_eq!(records[1]["member_position"], 1);
        assert_eq!(records[1]["state"], "unissued");

        let (_, body) = call(
            &h.router,
            Method::GET,
            "/api/v1/admin/records?roll_no=23cs001",
            Some(&token),
            None,
        )
        .await?;
        assert_eq!(body["records"].as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn visibility_toggle_blocks_and_restores_issuance() -> Result<()> {
        let h = harness()?;
        let token = login(&h.router).await?;
        let record = h.store.find_record("23CS002", EVENT)?.context("record")?;
        let uri = format!("/api/v1/admin/records/{}/visibility", record.id);

        let (status, body) = call(
            &h.router,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "visible": false })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["blocked"], true);
        assert_eq!(body["state"], "suppressed");
        let response = fetch_certificate(&h.router, "23CS002", EVENT).await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        call(
            &h.router,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "visible": true })),
        )
        .await?;
        let response = fetch_certificate(&h.router, "23CS002", EVENT).await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let (status, _) = call(
            &h.router,
            Method::PUT,
            "/api/v1/admin/records/9999/visibility",
            Some(&token),
            Some(json!({ "visible": false })),
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn reset_forces_regeneration() -> Result<()> {
        let h = harness()?;
        let token = login(&h.router).await?;
        fetch_certificate(&h.router, "23CS001", EVENT).await?;
        let record = h.store.find_record("23CS001", EVENT)?.context("record")?;
        assert!(record.cert_url.is_some());

        let (status, body) = call(
            &h.router,
            Method::DELETE,
            &format!("/api/v1/admin/records/{}/certificate", record.id),
            Some(&token),
            None,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("cert_url").is_none());
        assert_eq!(body["state"], "unissued");

        let response = fetch_certificate(&h.router, "23CS001", EVENT).await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(h.renders(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn stats_sum_per_event_totals() -> Result<()> {
        let h = harness()?;
        let token = login(&h.router).await?;
        fetch_certificate(&h.router, "23CS001", EVENT).await?;

        let (status, body) = call(&h.router, Method::GET, "/api/v1/admin/stats", Some(&token), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totals"]["records"], 3);
        assert_eq!(body["totals"]["issued"], 1);
        assert_eq!(body["totals"]["pending"], 2);
        let event = body["events"]
            .as_array()
            .and_then(|events| events.iter().find(|e| e["event"] == EVENT))
            .context("event stats")?;
        assert_eq!(event["records"], 2);
        Ok(())
    }

    #[tokio::test]
    async fn stats_break_unique_participants_down_by_department() -> Result<()> {
        let h = harness()?;
        let token = login(&h.router).await?;
        h.store.upsert_leader(
            QUIZ,
            "quiz",
            &Entrant {
                roll_no: "24IS001".to_string(),
                name: "E F".to_string(),
                department: "msc is&r".to_string(),
                year: "I".to_string(),
            },
        )?;

        let (status, body) = call(&h.router, Method::GET, "/api/v1/admin/stats", Some(&token), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unique_participants"], 3);
        assert_eq!(
            body["departments"],
            json!([
                { "department": "Computer Science", "participants": 2, "percentage": 66.7 },
                { "department": "MSc Information Science", "participants": 1, "percentage": 33.3 },
            ])
        );
        Ok(())
    }
}

mod maintenance {
    use super::*;

    #[tokio::test]
    async fn gate_blocks_public_routes_only() -> Result<()> {
        let h = harness()?;
        let token = login(&h.router).await?;

        let (status, body) = call(
            &h.router,
            Method::PUT,
            "/api/v1/admin/maintenance",
            Some(&token),
            Some(json!({ "enabled": true })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enabled"], true);

        let (status, body) = get_json(&h.router, "/api/v1/participants/23CS001").await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "MAINTENANCE");
        let response = fetch_certificate(&h.router, "23CS001", EVENT).await?;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = get_json(&h.router, "/health").await?;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(
            &h.router,
            Method::GET,
            "/api/v1/admin/maintenance",
            Some(&token),
            None,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enabled"], true);

        call(
            &h.router,
            Method::PUT,
            "/api/v1/admin/maintenance",
            Some(&token),
            Some(json!({ "enabled": false })),
        )
        .await?;
        let (status, _) = get_json(&h.router, "/api/v1/participants/23CS001").await?;
        assert_eq!(status, StatusCode::OK);
        Ok(())
    }
}

mod sync {
    use super::*;

    #[tokio::test]
    async fn sync_without_sources_is_unavailable() -> Result<()> {
        let h = harness()?;
        let token = login(&h.router).await?;
        let (status, _) = call(&h.router, Method::POST, "/api/v1/admin/sync", Some(&token), None).await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn triggered_sync_runs_in_background() -> Result<()> {
        let sheets = StaticSheetSource::new().with_sheet(
            "signups",
            &[&["Roll No", "Name", "Department"], &["24IT005", "E F", "IT"]],
        );
        let h = harness_with(|config| config, Some(sheets), Duration::ZERO)?;
        let token = login(&h.router).await?;

        let (status, body) = call(&h.router, Method::POST, "/api/v1/admin/sync", Some(&token), None).await?;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["status"] == "started" || body["status"] == "already_running");

        let mut last_run = Value::Null;
        for _ in 0..200 {
            let (_, body) = call(&h.router, Method::GET, "/api/v1/admin/sync", Some(&token), None).await?;
            if body["last_run"].is_object() {
                last_run = body["last_run"].clone();
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(last_run["sources"][0]["status"], "synced");
        assert_eq!(last_run["sources"][0]["leaders"], 1);

        let (status, body) = get_json(&h.router, "/api/v1/participants/24it005").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["events"][0]["event"], "WORKSHOP");
        Ok(())
    }
}
