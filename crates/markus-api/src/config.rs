//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use markus_core::upload::{CloudinaryConfig, DEFAULT_UPLOAD_FOLDER};
use markus_core::{Error, Result};
use markus_issuance::coordinator::IssuancePolicy;
use markus_issuance::renderer::DEFAULT_TEMPLATE_PATH;
use markus_sync::google::GoogleCredentials;

/// Configuration for the MarkUs API server.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled:
    /// - logs are pretty-printed
    /// - uploads may fall back to the in-memory gateway
    /// - the admin password may be left unset (admin login is then disabled)
    pub debug: bool,

    /// Participant database file.
    pub database_path: PathBuf,

    /// Certificate template image.
    pub template_path: PathBuf,

    /// Preferred certificate font; built-in fallbacks are tried after it.
    pub font_path: Option<PathBuf>,

    /// Directory rendered certificates are written to.
    pub generated_dir: PathBuf,

    /// JSON file listing spreadsheet sources. Sync is disabled without it.
    pub sources_path: Option<PathBuf>,

    /// Google service-account credentials.
    pub google: GoogleConfig,

    /// Cloudinary upload settings.
    pub upload: UploadConfig,

    /// Admin password. Admin login is disabled when unset.
    pub admin_password: Option<String>,

    /// Admin session lifetime in seconds.
    pub session_ttl_secs: u64,

    /// Loser poll interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Loser poll attempts before answering "in progress".
    pub poll_attempts: u32,

    /// CORS configuration.
    pub cors: CorsConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_port", &self.http_port)
            .field("debug", &self.debug)
            .field("database_path", &self.database_path)
            .field("template_path", &self.template_path)
            .field("font_path", &self.font_path)
            .field("generated_dir", &self.generated_dir)
            .field("sources_path", &self.sources_path)
            .field("google", &self.google)
            .field("upload", &self.upload)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_attempts", &self.poll_attempts)
            .field("cors", &self.cors)
            .finish()
    }
}

/// Google credential sources, in precedence order.
#[derive(Clone, Default)]
pub struct GoogleConfig {
    /// Inline service-account key JSON.
    pub credentials_json: Option<String>,
    /// Path to a service-account key file.
    pub credentials_path: Option<PathBuf>,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field(
                "credentials_json",
                &self.credentials_json.as_ref().map(|_| "[REDACTED]"),
            )
            .field("credentials_path", &self.credentials_path)
            .finish()
    }
}

impl GoogleConfig {
    /// Resolves the credential source: inline JSON, then file, then ambient.
    #[must_use]
    pub fn credentials(&self) -> GoogleCredentials {
        if let Some(json) = &self.credentials_json {
            GoogleCredentials::Json(json.clone())
        } else if let Some(path) = &self.credentials_path {
            GoogleCredentials::File(path.clone())
        } else {
            GoogleCredentials::Ambient
        }
    }
}

/// Cloudinary settings as read from the environment.
#[derive(Clone)]
pub struct UploadConfig {
    /// Cloud name.
    pub cloud_name: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// API secret.
    pub api_secret: Option<String>,
    /// Destination folder.
    pub folder: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            folder: DEFAULT_UPLOAD_FOLDER.to_string(),
        }
    }
}

impl std::fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "[REDACTED]"))
            .field("folder", &self.folder)
            .finish()
    }
}

impl UploadConfig {
    /// Returns the Cloudinary settings when all three credentials are set.
    #[must_use]
    pub fn cloudinary(&self) -> Option<CloudinaryConfig> {
        Some(CloudinaryConfig {
            cloud_name: self.cloud_name.clone()?,
            api_key: self.api_key.clone()?,
            api_secret: self.api_secret.clone()?,
            folder: self.folder.clone(),
        })
    }
}

/// CORS configuration for browser clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins. Use `["*"]` to allow all origins (development only).
    /// Empty list disables CORS entirely.
    pub allowed_origins: Vec<String>,

    /// Max age for preflight cache (seconds).
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: 3600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8000,
            debug: false,
            database_path: PathBuf::from("participants.db"),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            font_path: None,
            generated_dir: PathBuf::from("generated"),
            sources_path: None,
            google: GoogleConfig::default(),
            upload: UploadConfig::default(),
            admin_password: None,
            session_ttl_secs: 12 * 60 * 60,
            poll_interval_ms: 1000,
            poll_attempts: 15,
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("MARKUS_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("MARKUS_DEBUG")? {
            config.debug = debug;
        }
        if let Some(path) = env_string("MARKUS_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(path) = env_string("MARKUS_TEMPLATE_PATH") {
            config.template_path = PathBuf::from(path);
        }
        config.font_path = env_string("MARKUS_FONT_PATH").map(PathBuf::from);
        if let Some(path) = env_string("MARKUS_GENERATED_DIR") {
            config.generated_dir = PathBuf::from(path);
        }
        config.sources_path = env_string("MARKUS_SOURCES_PATH").map(PathBuf::from);

        config.google.credentials_json = env_string("MARKUS_GOOGLE_CREDENTIALS_JSON");
        config.google.credentials_path =
            env_string("MARKUS_GOOGLE_CREDENTIALS_PATH").map(PathBuf::from);

        config.upload.cloud_name = env_string("CLOUDINARY_CLOUD_NAME");
        config.upload.api_key = env_string("CLOUDINARY_API_KEY");
        config.upload.api_secret = env_string("CLOUDINARY_API_SECRET");
        if let Some(folder) = env_string("MARKUS_UPLOAD_FOLDER") {
            config.upload.folder = folder;
        }

        config.admin_password = env_string("MARKUS_ADMIN_PASSWORD");
        if let Some(ttl) = env_u64("MARKUS_SESSION_TTL_SECS")? {
            config.session_ttl_secs = ttl;
        }
        if let Some(ms) = env_u64("MARKUS_POLL_INTERVAL_MS")? {
            config.poll_interval_ms = ms;
        }
        if let Some(attempts) = env_u32("MARKUS_POLL_ATTEMPTS")? {
            config.poll_attempts = attempts;
        }

        if let Some(origins) = env_string("MARKUS_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_cors_allowed_origins(&origins);
        }

        Ok(config)
    }

    /// Checks settings that must hold before serving.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated requirement.
    pub fn validate(&self) -> Result<()> {
        if self.session_ttl_secs == 0 {
            return Err(Error::InvalidInput(
                "MARKUS_SESSION_TTL_SECS must be greater than 0".to_string(),
            ));
        }
        if self.poll_attempts == 0 {
            return Err(Error::InvalidInput(
                "MARKUS_POLL_ATTEMPTS must be greater than 0".to_string(),
            ));
        }
        if self.debug {
            return Ok(());
        }
        if self.cors.allowed_origins.iter().any(|origin| origin == "*") {
            return Err(Error::InvalidInput(
                "MARKUS_CORS_ALLOWED_ORIGINS cannot include '*' when MARKUS_DEBUG=false"
                    .to_string(),
            ));
        }
        if self.admin_password.is_none() {
            return Err(Error::InvalidInput(
                "MARKUS_ADMIN_PASSWORD is required when MARKUS_DEBUG=false".to_string(),
            ));
        }
        if self.upload.cloudinary().is_none() {
            return Err(Error::InvalidInput(
                "CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET are required when MARKUS_DEBUG=false"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Issuance polling policy derived from the poll settings.
    #[must_use]
    pub fn issuance_policy(&self) -> IssuancePolicy {
        IssuancePolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.poll_attempts,
            ..IssuancePolicy::default()
        }
    }

    /// Admin session lifetime.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u16: {e}")))
}

fn env_u32(name: &str) -> Result<Option<u32>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u32>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u32: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed == "*" {
        return vec!["*".to_string()];
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production() -> Config {
        Config {
            admin_password: Some("secret".to_string()),
            upload: UploadConfig {
                cloud_name: Some("demo".to_string()),
                api_key: Some("key".to_string()),
                api_secret: Some("shh".to_string()),
                ..UploadConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn parse_bool_accepts_common_spellings() -> Result<()> {
        for value in ["true", "1", "YES", " y "] {
            assert!(parse_bool("X", value)?);
        }
        for value in ["false", "0", "No", "n"] {
            assert!(!parse_bool("X", value)?);
        }
        assert!(matches!(parse_bool("X", "maybe"), Err(Error::InvalidInput(_))));
        Ok(())
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        assert_eq!(
            parse_cors_allowed_origins(" https://a.example , ,https://b.example"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(parse_cors_allowed_origins("*"), vec!["*".to_string()]);
        assert!(parse_cors_allowed_origins("  ").is_empty());
    }

    #[test]
    fn production_requires_admin_password_and_cloudinary() {
        assert!(production().validate().is_ok());

        let mut config = production();
        config.admin_password = None;
        assert!(config.validate().is_err());

        let mut config = production();
        config.upload.api_secret = None;
        assert!(config.validate().is_err());

        let mut config = production();
        config.cors.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_mode_relaxes_requirements() {
        let config = Config {
            debug: true,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", production());
        assert!(!rendered.contains("secret\""));
        assert!(!rendered.contains("shh"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn policy_follows_poll_settings() {
        let config = Config {
            poll_interval_ms: 250,
            poll_attempts: 4,
            ..Config::default()
        };
        let policy = config.issuance_policy();
        assert_eq!(policy.poll_interval, Duration::from_millis(250));
        assert_eq!(policy.max_attempts, 4);
    }

    #[test]
    fn google_credentials_prefer_inline_json() {
        let config = GoogleConfig {
            credentials_json: Some("{}".to_string()),
            credentials_path: Some(PathBuf::from("key.json")),
        };
        assert!(matches!(config.credentials(), GoogleCredentials::Json(_)));
        assert!(matches!(
            GoogleConfig::default().credentials(),
            GoogleCredentials::Ambient
        ));
    }
}
