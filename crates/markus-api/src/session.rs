//! Admin sessions.
//!
//! A successful password login mints a random opaque token that expires
//! after a fixed lifetime. Tokens live in a [`SessionStore`] owned by the
//! application state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Number of random bytes in a session token.
const TOKEN_BYTES: usize = 32;

/// A freshly issued admin session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque bearer token.
    pub token: String,
    /// Instant after which the token is rejected.
    pub expires_at: DateTime<Utc>,
}

/// Storage for admin session tokens.
pub trait SessionStore: Send + Sync + 'static {
    /// Mints and records a new session.
    fn create(&self) -> Session;

    /// Returns true if `token` names a live session.
    fn validate(&self, token: &str) -> bool;

    /// Revokes `token`. Returns true if it was live.
    fn revoke(&self, token: &str) -> bool;
}

/// Process-local session store.
#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: chrono::Duration,
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemorySessionStore {
    /// Creates a store whose sessions last `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        // A poisoned map still holds valid tokens.
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self) -> Session {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut sessions = self.lock();
        sessions.retain(|_, expiry| *expiry > now);
        sessions.insert(token.clone(), expires_at);
        Session { token, expires_at }
    }

    fn validate(&self, token: &str) -> bool {
        let now = Utc::now();
        let mut sessions = self.lock();
        match sessions.get(token) {
            Some(expiry) if *expiry > now => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    fn revoke(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }
}

/// Compares a submitted password against the configured one in constant time.
#[must_use]
pub fn password_matches(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
