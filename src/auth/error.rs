//! Error taxonomy for authentication and authorization outcomes.

use thiserror::Error;

/// Outcomes of authentication and authorization operations.
///
/// Policy evaluation itself never produces an error; a failed evaluation is a
/// deny decision. These variants cover sign-in, enrollment, federation, and
/// downstream token acquisition.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown identity, wrong password, or an account not eligible to sign in.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A full session is required but only a challenge session was presented.
    #[error("multi-factor verification required")]
    MfaRequired,

    /// The presented TOTP code did not match any accepted step.
    #[error("invalid multi-factor code")]
    InvalidMfaCode,

    /// The identity is locked out until the lockout window elapses.
    #[error("account locked out")]
    AccountLockedOut,

    /// A federated assertion was missing a claim required for provisioning.
    #[error("missing required claim: {0}")]
    MissingRequiredClaim(String),

    /// A named policy evaluated to deny.
    #[error("policy denied: {0}")]
    PolicyDenied(String),

    /// The upstream credential exchange failed or timed out.
    #[error("token acquisition failed: {0}")]
    TokenAcquisitionFailed(String),

    /// MFA enablement was attempted without verifying the generated secret.
    #[error("authenticator secret not verified")]
    UnverifiedSecret,
}

/// Errors surfaced by the identity and claim store adapters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("identity not found")]
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::AuthError;

    #[test]
    fn error_messages_do_not_leak_details() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "invalid credentials");
        assert_eq!(AuthError::AccountLockedOut.to_string(), "account locked out");
        assert_eq!(
            AuthError::MissingRequiredClaim("email".to_string()).to_string(),
            "missing required claim: email"
        );
    }
}
