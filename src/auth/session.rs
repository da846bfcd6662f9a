//! Server-side session records keyed by hashed tokens.
//!
//! Raw tokens are returned to the client once; lookups hash the presented
//! token and never compare raw values against storage.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use super::clock::Clock;

/// Session kinds used to gate the MFA challenge flow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionKind {
    /// Full session with normal access.
    Full,
    /// Challenge session limited to MFA verification.
    MfaChallenge,
}

#[derive(Clone, Debug)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub kind: SessionKind,
    pub expires_at: DateTime<Utc>,
}

/// A freshly minted session. The token leaves the server exactly once.
#[derive(Clone, Debug)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mint a new session token. The raw value is only returned to the client;
/// storage keys on the hash.
#[must_use]
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a session token so raw values never touch storage.
#[must_use]
pub fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// In-memory session store with lazy expiry.
pub struct SessionStore {
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<Vec<u8>, SessionRecord>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self, user_id: Uuid, kind: SessionKind, ttl_seconds: i64) -> IssuedSession {
        let token = generate_session_token();
        let expires_at = self.clock.now() + Duration::seconds(ttl_seconds);
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.insert(
            hash_session_token(&token),
            SessionRecord {
                user_id,
                kind,
                expires_at,
            },
        );
        IssuedSession { token, expires_at }
    }

    /// Resolve a raw token. Expired records are evicted rather than returned.
    pub fn lookup(&self, token: &str) -> Option<SessionRecord> {
        let token_hash = hash_session_token(token);
        let now = self.clock.now();
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match sessions.get(&token_hash) {
            Some(record) if record.expires_at > now => Some(record.clone()),
            Some(_) => {
                sessions.remove(&token_hash);
                None
            }
            None => None,
        }
    }

    pub fn remove(&self, token: &str) {
        let token_hash = hash_session_token(token);
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.remove(&token_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::FixedClock;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::TimeZone;

    fn fixed_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn generated_tokens_are_unique_and_decodable() {
        let first = generate_session_token();
        let second = generate_session_token();
        assert_ne!(first, second);
        assert_eq!(URL_SAFE_NO_PAD.decode(first.as_bytes()).unwrap().len(), 32);
    }

    #[test]
    fn hash_session_token_stable() {
        assert_eq!(hash_session_token("token"), hash_session_token("token"));
        assert_ne!(hash_session_token("token"), hash_session_token("other"));
    }

    #[test]
    fn lookup_returns_live_sessions_only() {
        let clock = fixed_clock();
        let store = SessionStore::new(clock.clone());
        let user_id = Uuid::new_v4();

        let session = store.create(user_id, SessionKind::Full, 60);
        let record = store.lookup(&session.token).unwrap();
        assert_eq!(record.user_id, user_id);
        assert_eq!(record.kind, SessionKind::Full);

        clock.advance(Duration::seconds(61));
        assert!(store.lookup(&session.token).is_none());
        // Evicted, not just hidden
        clock.advance(Duration::seconds(-61));
        assert!(store.lookup(&session.token).is_none());
    }

    #[test]
    fn remove_invalidates_token() {
        let store = SessionStore::new(fixed_clock());
        let session = store.create(Uuid::new_v4(), SessionKind::MfaChallenge, 300);
        store.remove(&session.token);
        assert!(store.lookup(&session.token).is_none());
    }
}
