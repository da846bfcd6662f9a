//! TOTP secret generation, verification, and the enrollment lifecycle.

use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;

use super::clock::Clock;
use super::constant_time_eq;
use super::error::AuthError;
use super::identity::IdentityStore;

const SECRET_BYTES: usize = 20;

/// Secret and provisioning URI handed to the user at enrollment start.
#[derive(Clone, Debug)]
pub struct EnrollmentStart {
    pub secret: String,
    pub provisioning_uri: String,
}

/// RFC 6238 engine: SHA-1, configurable digits and step, one step of skew in
/// each direction.
pub struct TotpEngine {
    identities: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
    issuer: String,
    digits: usize,
    step_seconds: u64,
}

impl TotpEngine {
    #[must_use]
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
        issuer: String,
        digits: usize,
        step_seconds: u64,
    ) -> Self {
        Self {
            identities,
            clock,
            issuer,
            digits,
            step_seconds,
        }
    }

    /// Generate a fresh 160-bit secret, base32 without padding.
    #[must_use]
    pub fn generate_secret(&self) -> String {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        // to_encoded always returns the Encoded variant
        match Secret::Raw(bytes.to_vec()).to_encoded() {
            Secret::Encoded(encoded) => encoded,
            Secret::Raw(_) => String::new(),
        }
    }

    /// Provisioning URI for authenticator apps. Parameter order is fixed;
    /// enrolled apps scan this as a QR code.
    #[must_use]
    pub fn provisioning_uri(&self, secret: &str, email: &str) -> String {
        let issuer = &self.issuer;
        format!("otpauth://totp/{issuer}:{email}?secret={secret}&issuer={issuer}")
    }

    /// Verify a code against the current step and one step of skew in each
    /// direction. Malformed codes or secrets are a failed verification,
    /// never an error.
    #[must_use]
    pub fn verify_code(&self, secret: &str, code: &str, now: DateTime<Utc>) -> bool {
        let code = code.trim();
        if code.len() != self.digits || !code.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }

        let Ok(secret_bytes) = Secret::Encoded(secret.trim().to_string()).to_bytes() else {
            return false;
        };
        let Ok(totp) = TOTP::new(
            Algorithm::SHA1,
            self.digits,
            1,
            self.step_seconds,
            secret_bytes,
            Some(self.issuer.clone()),
            "user".to_string(),
        ) else {
            return false;
        };

        let timestamp = u64::try_from(now.timestamp()).unwrap_or(0);
        // Evaluate every candidate so verification cost does not depend on
        // which step matches.
        let mut matched = false;
        for step_start in [
            timestamp.saturating_sub(self.step_seconds),
            timestamp,
            timestamp.saturating_add(self.step_seconds),
        ] {
            let candidate = totp.generate(step_start);
            if constant_time_eq(candidate.as_bytes(), code.as_bytes()) {
                matched = true;
            }
        }
        matched
    }

    /// Start enrollment: store a pending secret on the identity and return it
    /// with the provisioning URI. Restarting replaces any previous pending
    /// secret.
    pub fn enroll_begin(&self, user_id: Uuid) -> Result<EnrollmentStart, AuthError> {
        let identity = self
            .identities
            .find_by_id(user_id)
            .ok_or(AuthError::InvalidCredentials)?;

        let secret = self.generate_secret();
        let pending = SecretString::from(secret.clone());
        self.identities
            .update(user_id, &mut |identity| {
                identity.mfa_secret = Some(pending.clone());
                identity.mfa_enabled = false;
            })
            .map_err(|_| AuthError::InvalidCredentials)?;

        let provisioning_uri = self.provisioning_uri(&secret, &identity.email);
        Ok(EnrollmentStart {
            secret,
            provisioning_uri,
        })
    }

    /// Confirm enrollment by verifying a code against the pending secret.
    /// MFA only turns on after this succeeds.
    pub fn enroll_confirm(&self, user_id: Uuid, code: &str) -> Result<(), AuthError> {
        let identity = self
            .identities
            .find_by_id(user_id)
            .ok_or(AuthError::InvalidCredentials)?;

        let Some(pending) = identity.mfa_secret.as_ref() else {
            return Err(AuthError::UnverifiedSecret);
        };
        if identity.mfa_enabled {
            return Ok(());
        }

        if !self.verify_code(pending.expose_secret(), code, self.clock.now()) {
            return Err(AuthError::InvalidMfaCode);
        }

        self.identities
            .update(user_id, &mut |identity| identity.mfa_enabled = true)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    /// Disable MFA and drop the stored secret.
    pub fn disable(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.identities
            .update(user_id, &mut |identity| {
                identity.mfa_secret = None;
                identity.mfa_enabled = false;
            })
            .map_err(|_| AuthError::InvalidCredentials)
    }
}
