//! Identity records and the identity store seam.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::constant_time_eq;
use super::error::StoreError;

/// A local account.
///
/// `password_hash` is absent for federation-only accounts; such identities
/// can never sign in with a password. `mfa_secret` holds a pending secret
/// until `mfa_enabled` flips on confirmation.
#[derive(Clone, Debug)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: Option<Vec<u8>>,
    pub mfa_secret: Option<SecretString>,
    pub mfa_enabled: bool,
    pub failed_attempts: u32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub email_confirmed: bool,
    pub confirmation_token_hash: Option<Vec<u8>>,
}

impl Identity {
    /// A password-based account awaiting email confirmation.
    #[must_use]
    pub fn with_password(username: &str, email: &str, password: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: normalize_email(email),
            password_hash: Some(hash_password(password)),
            mfa_secret: None,
            mfa_enabled: false,
            failed_attempts: 0,
            lockout_until: None,
            email_confirmed: false,
            confirmation_token_hash: None,
        }
    }

    /// A federated account: no password, email confirmed by the provider.
    #[must_use]
    pub fn federated(username: &str, email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: normalize_email(email),
            password_hash: None,
            mfa_secret: None,
            mfa_enabled: false,
            failed_attempts: 0,
            lockout_until: None,
            email_confirmed: true,
            confirmation_token_hash: None,
        }
    }
}

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Digest a password for storage. The durable store owns the real KDF; the
/// in-memory adapter only needs an opaque, comparable representation.
#[must_use]
pub fn hash_password(password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

#[must_use]
pub fn verify_password(password: &str, hash: &[u8]) -> bool {
    constant_time_eq(&hash_password(password), hash)
}

/// Storage seam for identities.
///
/// `update` is a serialized read-modify-write so failed-attempt and lockout
/// mutations are atomic with respect to concurrent sign-in attempts.
pub trait IdentityStore: Send + Sync {
    fn insert(&self, identity: Identity) -> Result<(), StoreError>;

    fn find_by_id(&self, id: Uuid) -> Option<Identity>;

    /// Lookup by normalized email.
    fn find_by_email(&self, email: &str) -> Option<Identity>;

    fn update(&self, id: Uuid, apply: &mut dyn FnMut(&mut Identity)) -> Result<(), StoreError>;
}

/// In-memory identity store used by the server and tests.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    inner: RwLock<HashMap<Uuid, Identity>>,
}

impl InMemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn insert(&self, identity: Identity) -> Result<(), StoreError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if map.values().any(|existing| existing.email == identity.email) {
            return Err(StoreError::DuplicateEmail);
        }
        map.insert(identity.id, identity);
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Option<Identity> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&id).cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<Identity> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.values().find(|identity| identity.email == email).cloned()
    }

    fn update(&self, id: Uuid, apply: &mut dyn FnMut(&mut Identity)) -> Result<(), StoreError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let identity = map.get_mut(&id).ok_or(StoreError::NotFound)?;
        apply(identity);
        Ok(())
    }
}
