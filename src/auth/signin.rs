//! Two-stage sign-in orchestration with shared lockout accounting.
//!
//! Password and MFA failures feed one counter per identity. The counter only
//! resets when a full session is issued, so a correct password followed by
//! bad TOTP codes still walks toward lockout.

use chrono::Duration;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::clock::Clock;
use super::error::AuthError;
use super::identity::{normalize_email, verify_password, Identity, IdentityStore};
use super::session::{IssuedSession, SessionKind, SessionStore};
use super::state::AuthConfig;
use super::totp::TotpEngine;

/// Successful sign-in outcomes.
#[derive(Clone, Debug)]
pub enum SignIn {
    /// Fully authenticated; the session grants normal access.
    Authenticated(IssuedSession),
    /// Password accepted, MFA pending; the challenge session only allows
    /// code verification.
    RequiresMfa { challenge: IssuedSession },
}

enum FailureStage {
    Password,
    Mfa,
}

pub struct SignInOrchestrator {
    identities: Arc<dyn IdentityStore>,
    sessions: Arc<SessionStore>,
    totp: Arc<TotpEngine>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl SignInOrchestrator {
    #[must_use]
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        sessions: Arc<SessionStore>,
        totp: Arc<TotpEngine>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            identities,
            sessions,
            totp,
            clock,
            config,
        }
    }

    /// Password stage. Unknown emails, unconfirmed accounts, and federated
    /// accounts without a password all fail the same way.
    pub fn password_sign_in(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignIn, AuthError> {
        let email_normalized = normalize_email(email);
        let Some(identity) = self.identities.find_by_email(&email_normalized) else {
            return Err(AuthError::InvalidCredentials);
        };

        self.check_lockout(&identity)?;

        if !identity.email_confirmed {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(password_hash) = identity.password_hash.as_deref() else {
            return Err(self.record_failure(identity.id, &FailureStage::Password));
        };
        if !verify_password(password, password_hash) {
            return Err(self.record_failure(identity.id, &FailureStage::Password));
        }

        if identity.mfa_enabled {
            let challenge = self.sessions.create(
                identity.id,
                SessionKind::MfaChallenge,
                self.config.challenge_ttl_seconds(),
            );
            return Ok(SignIn::RequiresMfa { challenge });
        }

        self.complete(identity.id, remember_me)
    }

    /// MFA stage against an outstanding challenge session. The challenge is
    /// consumed on success.
    pub fn verify_mfa(
        &self,
        challenge_token: &str,
        code: &str,
        remember_me: bool,
    ) -> Result<SignIn, AuthError> {
        let Some(record) = self.sessions.lookup(challenge_token) else {
            return Err(AuthError::InvalidCredentials);
        };
        if record.kind != SessionKind::MfaChallenge {
            return Err(AuthError::InvalidCredentials);
        }
        let Some(identity) = self.identities.find_by_id(record.user_id) else {
            return Err(AuthError::InvalidCredentials);
        };

        self.check_lockout(&identity)?;

        let secret = match identity.mfa_secret.as_ref() {
            Some(secret) if identity.mfa_enabled => secret,
            _ => return Err(AuthError::InvalidCredentials),
        };

        if !self
            .totp
            .verify_code(secret.expose_secret(), code, self.clock.now())
        {
            return Err(self.record_failure(identity.id, &FailureStage::Mfa));
        }

        self.sessions.remove(challenge_token);
        self.complete(identity.id, remember_me)
    }

    fn check_lockout(&self, identity: &Identity) -> Result<(), AuthError> {
        match identity.lockout_until {
            Some(until) if until > self.clock.now() => Err(AuthError::AccountLockedOut),
            _ => Ok(()),
        }
    }

    /// Count a failed attempt; the attempt that reaches the limit starts the
    /// lockout window and reports it immediately.
    fn record_failure(&self, user_id: Uuid, stage: &FailureStage) -> AuthError {
        let now = self.clock.now();
        let max_attempts = self.config.max_failed_attempts();
        let lockout = Duration::minutes(self.config.lockout_minutes());
        let mut locked = false;
        if let Err(err) = self.identities.update(user_id, &mut |identity| {
            identity.failed_attempts += 1;
            if identity.failed_attempts >= max_attempts {
                identity.lockout_until = Some(now + lockout);
                identity.failed_attempts = 0;
                locked = true;
            }
        }) {
            error!("Failed to record sign-in failure for {user_id}: {err}");
        }

        if locked {
            info!("Account locked out: {user_id}");
            return AuthError::AccountLockedOut;
        }
        match stage {
            FailureStage::Password => AuthError::InvalidCredentials,
            FailureStage::Mfa => AuthError::InvalidMfaCode,
        }
    }

    /// Issue a full session and clear the failure state.
    fn complete(&self, user_id: Uuid, remember_me: bool) -> Result<SignIn, AuthError> {
        self.identities
            .update(user_id, &mut |identity| {
                identity.failed_attempts = 0;
                identity.lockout_until = None;
            })
            .map_err(|_| AuthError::InvalidCredentials)?;

        let ttl_seconds = if remember_me {
            self.config.remember_me_ttl_seconds()
        } else {
            self.config.session_ttl_seconds()
        };
        let session = self.sessions.create(user_id, SessionKind::Full, ttl_seconds);
        Ok(SignIn::Authenticated(session))
    }
}
