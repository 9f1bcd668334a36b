//! API error types and HTTP response mapping.

use axum::Json;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::HeaderName;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use markus_core::Error as CoreError;
use markus_core::store::StoreError;
use markus_issuance::IssueError;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Standard JSON error response body.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ApiErrorBody {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message (safe for clients).
    pub message: String,
}

/// HTTP API error with stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Returns an error response for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Returns an error response for authentication failures.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// Returns an error response when no session credential was presented.
    #[must_use]
    pub fn missing_session() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "MISSING_SESSION",
            "Admin session required",
        )
    }

    /// Returns an error response when the session token is unknown or expired.
    #[must_use]
    pub fn invalid_session() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_SESSION",
            "Invalid or expired admin session",
        )
    }

    /// Returns an error response for authorization failures.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// Returns an error response for missing resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Returns an error response while a certificate is being generated.
    #[must_use]
    pub fn in_progress(retry_after_secs: u64) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "IN_PROGRESS",
            "Certificate is being generated, retry shortly",
        )
        .with_retry_after(retry_after_secs)
    }

    /// Returns an error response while maintenance mode is on.
    #[must_use]
    pub fn maintenance() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "MAINTENANCE",
            "The portal is under maintenance",
        )
    }

    /// Returns an error response for a dependency that is not configured.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
    }

    /// Returns an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    /// Attaches a Retry-After header value in seconds.
    #[must_use]
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_secs = Some(seconds);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry_after_secs = self.retry_after_secs;
        let mut response = (
            self.status,
            Json(ApiErrorBody {
                code: self.code.to_string(),
                message: self.message,
            }),
        )
            .into_response();

        if let Some(secs) = retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static("retry-after"), value);
            }
        }

        response
    }
}

impl From<IssueError> for ApiError {
    fn from(value: IssueError) -> Self {
        match value {
            IssueError::NotFound { roll_no, event } => {
                Self::not_found(format!("no registration for {roll_no} in {event}"))
            }
            IssueError::Suppressed { .. } => {
                Self::forbidden("This certificate has been withheld")
            }
            IssueError::InProgress { retry_after } => {
                Self::in_progress(retry_after.as_secs().max(1))
            }
            other => {
                tracing::error!(error = %other, "certificate issuance failed");
                Self::internal("Certificate generation failed")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { id } => Self::not_found(format!("record not found: {id}")),
            other => {
                tracing::error!(error = %other, "participant store failure");
                Self::internal("Internal error")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidInput(message) => Self::bad_request(message),
            other => {
                tracing::error!(error = %other, "internal error");
                Self::internal("Internal error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use markus_issuance::RenderError;

    #[test]
    fn in_progress_sets_retry_after_header() {
        let response = ApiError::from(IssueError::InProgress {
            retry_after: Duration::from_secs(5),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok()),
            Some("5")
        );
    }

    #[test]
    fn sub_second_retry_after_rounds_up_to_one() {
        let err = ApiError::from(IssueError::InProgress {
            retry_after: Duration::from_millis(200),
        });
        assert_eq!(err.retry_after_secs, Some(1));
    }

    #[test]
    fn issuance_taxonomy_maps_to_status_codes() {
        let not_found = ApiError::from(IssueError::NotFound {
            roll_no: "23CS001".to_string(),
            event: "EVENT".to_string(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let suppressed = ApiError::from(IssueError::Suppressed {
            roll_no: "23CS001".to_string(),
            event: "EVENT".to_string(),
        });
        assert_eq!(suppressed.status(), StatusCode::FORBIDDEN);
        assert_eq!(suppressed.code(), "FORBIDDEN");
    }

    #[test]
    fn internal_failures_hide_detail() {
        let err = ApiError::from(IssueError::Render(RenderError::TemplateMissing {
            path: "/secret/template.png".into(),
        }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("/secret"));
    }

    #[test]
    fn store_not_found_is_404() {
        let err = ApiError::from(StoreError::NotFound { id: 9 });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
