//! External identity-provider federation.
//!
//! An assertion from a trusted provider maps onto a local identity: existing
//! accounts are looked up by email, first-time visitors are provisioned
//! without a password. The adapter never creates duplicate accounts for
//! repeated logins.

use std::sync::Arc;
use tracing::info;

use super::clock::Clock;
use super::error::{AuthError, StoreError};
use super::identity::{normalize_email, Identity, IdentityStore};
use super::session::{IssuedSession, SessionKind, SessionStore};

/// Validated claims extracted from an external provider's response.
/// Consumed once per login.
#[derive(Clone, Debug)]
pub struct ExternalAssertion {
    pub provider: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

pub struct FederationAdapter {
    identities: Arc<dyn IdentityStore>,
    sessions: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
    session_ttl_seconds: i64,
}

impl FederationAdapter {
    #[must_use]
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        sessions: Arc<SessionStore>,
        clock: Arc<dyn Clock>,
        session_ttl_seconds: i64,
    ) -> Self {
        Self {
            identities,
            sessions,
            clock,
            session_ttl_seconds,
        }
    }

    /// Complete an external login: look up or provision the local identity
    /// and issue a full session.
    pub fn complete_external_login(
        &self,
        assertion: &ExternalAssertion,
    ) -> Result<IssuedSession, AuthError> {
        let email = assertion
            .email
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::MissingRequiredClaim("email".to_string()))?;
        let display_name = assertion
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::MissingRequiredClaim("name".to_string()))?;

        let email_normalized = normalize_email(email);
        let identity = match self.identities.find_by_email(&email_normalized) {
            Some(existing) => existing,
            None => self.provision(display_name, &email_normalized)?,
        };

        match identity.lockout_until {
            Some(until) if until > self.clock.now() => return Err(AuthError::AccountLockedOut),
            _ => {}
        }

        let session =
            self.sessions
                .create(identity.id, SessionKind::Full, self.session_ttl_seconds);
        Ok(session)
    }

    fn provision(&self, display_name: &str, email_normalized: &str) -> Result<Identity, AuthError> {
        let identity = Identity::federated(display_name, email_normalized);
        match self.identities.insert(identity.clone()) {
            Ok(()) => {
                info!("Provisioned federated identity for {email_normalized}");
                Ok(identity)
            }
            // Lost a provisioning race; the winner's record is the account
            Err(StoreError::DuplicateEmail) => self
                .identities
                .find_by_email(email_normalized)
                .ok_or(AuthError::InvalidCredentials),
            Err(StoreError::NotFound) => Err(AuthError::InvalidCredentials),
        }
    }
}
