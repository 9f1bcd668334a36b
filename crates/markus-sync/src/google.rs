//! Google Sheets values API client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::SourceError;
use crate::source::{SheetSource, SheetTable, SourceConfig};

const SHEETS_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets.readonly"];

/// Default API base URL.
pub const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com";

/// Range read when a source does not name one.
pub const DEFAULT_RANGE: &str = "A:ZZ";

/// Where service-account credentials come from.
#[derive(Clone)]
pub enum GoogleCredentials {
    /// Inline service-account key JSON.
    Json(String),
    /// Path to a service-account key file.
    File(PathBuf),
    /// Ambient discovery (`GOOGLE_APPLICATION_CREDENTIALS`, metadata server, gcloud).
    Ambient,
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(_) => f.write_str("Json([REDACTED])"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Ambient => f.write_str("Ambient"),
        }
    }
}

enum Auth {
    Provider(Arc<dyn TokenProvider>),
    Static(String),
}

/// [`SheetSource`] backed by the Google Sheets v4 values API.
pub struct GoogleSheetsSource {
    auth: Auth,
    client: reqwest::Client,
    endpoint: String,
}

impl std::fmt::Debug for GoogleSheetsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsSource")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn http_client() -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| SourceError::Config(format!("failed to create HTTP client: {e}")))
}

impl GoogleSheetsSource {
    /// Creates a source authenticated with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Credentials`] if the key cannot be loaded.
    pub async fn new(credentials: GoogleCredentials) -> Result<Self, SourceError> {
        let provider: Arc<dyn TokenProvider> = match credentials {
            GoogleCredentials::Json(json) => Arc::new(
                CustomServiceAccount::from_json(&json)
                    .map_err(|e| SourceError::Credentials(format!("invalid key JSON: {e}")))?,
            ),
            GoogleCredentials::File(path) => Arc::new(
                CustomServiceAccount::from_file(&path).map_err(|e| {
                    SourceError::Credentials(format!("failed to load {}: {e}", path.display()))
                })?,
            ),
            GoogleCredentials::Ambient => gcp_auth::provider().await.map_err(|e| {
                SourceError::Credentials(format!("failed to initialize GCP auth: {e}"))
            })?,
        };

        Ok(Self {
            auth: Auth::Provider(provider),
            client: http_client()?,
            endpoint: DEFAULT_SHEETS_ENDPOINT.to_string(),
        })
    }

    /// Creates a source that sends a fixed bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_static_token(token: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self {
            auth: Auth::Static(token.into()),
            client: http_client()?,
            endpoint: DEFAULT_SHEETS_ENDPOINT.to_string(),
        })
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        match &self.auth {
            Auth::Static(token) => Ok(token.clone()),
            Auth::Provider(provider) => {
                let token = provider
                    .token(SHEETS_SCOPES)
                    .await
                    .map_err(|e| SourceError::Credentials(format!("failed to get token: {e}")))?;
                Ok(token.as_str().to_string())
            }
        }
    }

    fn values_url(&self, source: &SourceConfig) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| SourceError::Config(format!("invalid endpoint {}: {e}", self.endpoint)))?;
        let range = source.range.as_deref().unwrap_or(DEFAULT_RANGE);
        url.path_segments_mut()
            .map_err(|()| SourceError::Config(format!("endpoint cannot be a base: {}", self.endpoint)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", source.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    #[instrument(skip(self, source), fields(source = %source.name))]
    async fn fetch(&self, source: &SourceConfig) -> Result<SheetTable, SourceError> {
        if source.spreadsheet_id.trim().is_empty() {
            return Err(SourceError::Config(format!(
                "source {} has no spreadsheet_id",
                source.name
            )));
        }

        let url = self.values_url(source)?;
        let token = self.access_token().await?;
        let response = self.client.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => {
                return Err(SourceError::SheetNotFound {
                    name: source.name.clone(),
                });
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Credentials(format!(
                    "sheet service refused access ({status}): {body}"
                )));
            }
            s if !s.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(SourceError::Rejected {
                    status: s.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let body: ValueRange = response.json().await?;
        let values: Vec<Vec<String>> = body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        debug!(rows = values.len(), "fetched sheet values");
        Ok(SheetTable::from_values(values))
    }
}
