//! Request context: admin session extraction and request IDs.
//!
//! Admin routes take an [`AdminSession`] argument. The token is read from
//! `Authorization: Bearer <token>` first, then from the `markus_admin`
//! cookie set at login.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::header::HeaderName;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use ulid::Ulid;

use crate::error::ApiError;
use crate::server::AppState;

/// Header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cookie carrying the admin session token.
pub const SESSION_COOKIE: &str = "markus_admin";

/// A validated admin session.
#[derive(Debug, Clone)]
pub struct AdminSession {
    /// The session token presented by the client.
    pub token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let token = bearer_token(headers)
            .or_else(|| cookie_value(headers, SESSION_COOKIE))
            .ok_or_else(ApiError::missing_session)?;

        if !state.sessions.validate(&token) {
            return Err(ApiError::invalid_session());
        }
        Ok(Self { token })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = header_string(headers, "Authorization")?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all("Cookie")
        .iter()
        .filter_map(header_value_to_string)
        .flat_map(|raw| {
            raw.split(';')
                .filter_map(|pair| {
                    let (key, value) = pair.trim().split_once('=')?;
                    (key == name && !value.is_empty()).then(|| value.to_string())
                })
                .collect::<Vec<_>>()
        })
        .next()
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?;
    header_value_to_string(value)
}

fn header_value_to_string(value: &HeaderValue) -> Option<String> {
    value.to_str().ok().map(str::to_string)
}

/// Builds the `Set-Cookie` value for a new session.
#[must_use]
pub fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}")
}

/// Builds the `Set-Cookie` value that clears the session cookie.
#[must_use]
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

/// Tags each request with an ID.
///
/// An incoming `X-Request-Id` is kept; otherwise a ULID is generated. The ID
/// is attached to the request span and echoed on the response.
pub async fn request_id_middleware(req: Request<Body>, next: Next) -> Response {
    let request_id =
        header_string(req.headers(), REQUEST_ID_HEADER).unwrap_or_else(|| Ulid::new().to_string());
    let span = tracing::info_span!("request", request_id = %request_id);

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(value) {
                map.append(*name, value);
            }
        }
        map
    }

    #[test]
    fn bearer_token_requires_prefix() {
        assert_eq!(
            bearer_token(&headers(&[("authorization", "Bearer abc")])),
            Some("abc".to_string())
        );
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic abc")])), None);
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer ")])), None);
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let map = headers(&[
            ("cookie", "theme=dark"),
            ("cookie", "a=1; markus_admin=tok123; b=2"),
        ]);
        assert_eq!(cookie_value(&map, SESSION_COOKIE), Some("tok123".to_string()));
        assert_eq!(cookie_value(&map, "missing"), None);
        assert_eq!(
            cookie_value(&headers(&[("cookie", "markus_admin=")]), SESSION_COOKIE),
            None
        );
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok", 60);
        assert!(cookie.starts_with("markus_admin=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=60"));
        assert!(expired_session_cookie().contains("Max-Age=0"));
    }
}
