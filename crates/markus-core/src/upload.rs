//! Upload gateway: turns a rendered certificate file into a permanent URL.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha1::{Digest, Sha1};

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default Cloudinary folder for certificates.
pub const DEFAULT_UPLOAD_FOLDER: &str = "certificates";

/// Errors from an upload gateway.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The local file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the file being uploaded.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Transport-level failure talking to the storage service.
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The storage service refused the upload.
    #[error("upload rejected (status {status}): {message}")]
    Rejected {
        /// HTTP status code returned.
        status: u16,
        /// Message from the service.
        message: String,
    },

    /// The gateway is misconfigured.
    #[error("upload gateway misconfigured: {0}")]
    Config(String),
}

/// Uploads a local file and returns its permanent URL.
///
/// Re-uploading the same file is allowed; implementations may overwrite or
/// create a second stored asset.
#[async_trait]
pub trait UploadGateway: Send + Sync + 'static {
    /// Uploads `local_path` and returns the URL it can be downloaded from.
    async fn upload(&self, local_path: &Path) -> Result<String, UploadError>;
}

// ============================================================================
// Cloudinary
// ============================================================================

/// Credentials and placement for Cloudinary signed uploads.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (account identifier).
    pub cloud_name: String,
    /// API key.
    pub api_key: String,
    /// API secret used for signing.
    pub api_secret: String,
    /// Destination folder.
    pub folder: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: Option<String>,
    error: Option<CloudinaryErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

/// Signed-upload gateway for Cloudinary.
///
/// The public id is the file stem, so re-uploading a regenerated
/// certificate replaces the stored asset.
#[derive(Debug, Clone)]
pub struct CloudinaryGateway {
    config: CloudinaryConfig,
    endpoint: String,
    client: reqwest::Client,
}

impl CloudinaryGateway {
    /// Creates a gateway for the configured cloud.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Config`] if credentials are missing or the
    /// HTTP client cannot be built.
    pub fn new(config: CloudinaryConfig) -> Result<Self, UploadError> {
        for (name, value) in [
            ("cloud_name", &config.cloud_name),
            ("api_key", &config.api_key),
            ("api_secret", &config.api_secret),
        ] {
            if value.trim().is_empty() {
                return Err(UploadError::Config(format!("{name} must not be empty")));
            }
        }
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UploadError::Config(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{CLOUDINARY_API_BASE}/{}/image/upload", config.cloud_name);
        Ok(Self {
            config,
            endpoint,
            client,
        })
    }

    /// Overrides the upload endpoint (tests).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Builds the canonical string Cloudinary signs: `k=v` pairs sorted by key
/// and joined with `&`.
fn string_to_sign(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl UploadGateway for CloudinaryGateway {
    async fn upload(&self, local_path: &Path) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| UploadError::Io {
                path: local_path.display().to_string(),
                source,
            })?;
        let file_name = local_path
            .file_name()
            .map_or_else(|| "certificate.png".to_string(), |n| n.to_string_lossy().into_owned());
        let public_id = local_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::Config(format!("no file stem in {}", local_path.display())))?;

        let params = [
            ("folder", self.config.folder.clone()),
            ("overwrite", "true".to_string()),
            ("public_id", public_id),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let signature = sign(&params, &self.config.api_secret);

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body: CloudinaryResponse = response.json().await?;

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: body
                    .error
                    .map_or_else(|| "no error message".to_string(), |e| e.message),
            });
        }

        let url = body.secure_url.ok_or_else(|| UploadError::Rejected {
            status: status.as_u16(),
            message: "response did not include secure_url".to_string(),
        })?;
        tracing::info!(path = %local_path.display(), url = %url, "certificate uploaded");
        Ok(url)
    }
}

// ============================================================================
// In-memory gateway
// ============================================================================

/// In-process gateway for tests and local development.
///
/// Returns `memory://<file stem>` URLs and keeps the uploaded bytes.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    uploads: AtomicUsize,
    fail: AtomicBool,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful uploads so far.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Makes subsequent uploads fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns the stored bytes for a URL returned by [`UploadGateway::upload`].
    #[must_use]
    pub fn object(&self, url: &str) -> Option<Vec<u8>> {
        let objects = self.objects.lock().ok()?;
        objects.get(url).cloned()
    }
}

#[async_trait]
impl UploadGateway for MemoryGateway {
    async fn upload(&self, local_path: &Path) -> Result<String, UploadError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(UploadError::Rejected {
                status: 503,
                message: "memory gateway set to fail".to_string(),
            });
        }
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| UploadError::Io {
                path: local_path.display().to_string(),
                source,
            })?;
        let stem = local_path
            .file_stem()
            .map_or_else(|| "object".to_string(), |s| s.to_string_lossy().into_owned());
        let url = format!("memory://{stem}");
        self.objects
            .lock()
            .map_err(|_| UploadError::Config("memory gateway lock poisoned".to_string()))?
            .insert(url.clone(), bytes);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use serde_json::json;
    use tempfile::TempDir;

    async fn spawn_upload_server(status: StatusCode, body: serde_json::Value) -> Result<String> {
        let app = Router::new().route(
            "/upload",
            post(move || {
                let body = body.clone();
                async move { (status, axum::Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind")?;
        let addr = listener.local_addr().context("local addr")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{addr}/upload"))
    }

    fn config() -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            folder: DEFAULT_UPLOAD_FOLDER.to_string(),
        }
    }

    fn write_file(dir: &TempDir, name: &str) -> Result<std::path::PathBuf> {
        let path = dir.path().join(name);
        std::fs::write(&path, b"png-bytes").context("write file")?;
        Ok(path)
    }

    #[test]
    fn string_to_sign_sorts_keys() {
        let params = [
            ("timestamp", "1700000000".to_string()),
            ("folder", "certificates".to_string()),
            ("public_id", "23CS001_QUIZ".to_string()),
        ];
        assert_eq!(
            string_to_sign(&params),
            "folder=certificates&public_id=23CS001_QUIZ&timestamp=1700000000"
        );
    }

    #[test]
    fn sign_is_sha1_of_canonical_string_and_secret() {
        // SHA-1("abc")
        assert_eq!(sign(&[], "abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn new_rejects_missing_credentials() {
        let mut cfg = config();
        cfg.api_secret = "  ".to_string();
        assert!(matches!(
            CloudinaryGateway::new(cfg),
            Err(UploadError::Config(_))
        ));
    }

    #[test]
    fn config_debug_redacts_secret() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn cloudinary_upload_returns_secure_url() -> Result<()> {
        let endpoint = spawn_upload_server(
            StatusCode::OK,
            json!({ "secure_url": "https://res.cloudinary.com/demo/certificates/23CS001_QUIZ.png" }),
        )
        .await?;
        let dir = TempDir::new()?;
        let path = write_file(&dir, "23CS001_QUIZ.png")?;

        let gateway = CloudinaryGateway::new(config())?.with_endpoint(endpoint);
        let url = gateway.upload(&path).await?;
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/certificates/23CS001_QUIZ.png"
        );
        Ok(())
    }

    #[tokio::test]
    async fn cloudinary_rejection_is_reported() -> Result<()> {
        let endpoint = spawn_upload_server(
            StatusCode::UNAUTHORIZED,
            json!({ "error": { "message": "Invalid Signature" } }),
        )
        .await?;
        let dir = TempDir::new()?;
        let path = write_file(&dir, "23CS001_QUIZ.png")?;

        let gateway = CloudinaryGateway::new(config())?.with_endpoint(endpoint);
        let err = gateway.upload(&path).await.unwrap_err();
        assert!(matches!(err, UploadError::Rejected { status: 401, .. }));
        assert!(err.to_string().contains("Invalid Signature"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() -> Result<()> {
        let dir = TempDir::new()?;
        let gateway = MemoryGateway::new();
        let err = gateway
            .upload(&dir.path().join("missing.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn memory_gateway_counts_and_fails_on_demand() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_file(&dir, "23CS001_QUIZ.png")?;
        let gateway = MemoryGateway::new();

        let url = gateway.upload(&path).await?;
        assert_eq!(url, "memory://23CS001_QUIZ");
        assert_eq!(gateway.object(&url).as_deref(), Some(&b"png-bytes"[..]));
        assert_eq!(gateway.upload_count(), 1);

        gateway.set_failing(true);
        assert!(gateway.upload(&path).await.is_err());
        assert_eq!(gateway.upload_count(), 1);
        Ok(())
    }
}
