//! HTTP handlers and their shared helpers.

pub mod external;
pub mod health;
pub mod hr;
pub mod login;
pub mod mfa;
pub mod principal;
pub mod profile;
pub mod register;
pub mod session;
pub mod types;

mod utils;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::auth::error::AuthError;

/// Map engine errors onto HTTP responses.
///
/// Password and MFA failures share one message so responses do not reveal
/// which stage rejected the attempt; lockout is disclosed distinctly at both
/// stages.
pub(crate) fn auth_error_response(err: &AuthError) -> Response {
    let (status, message) = match err {
        AuthError::InvalidCredentials | AuthError::InvalidMfaCode => {
            (StatusCode::UNAUTHORIZED, "Failed to login.".to_string())
        }
        AuthError::AccountLockedOut => (StatusCode::LOCKED, "You are locked out.".to_string()),
        AuthError::MfaRequired => (
            StatusCode::UNAUTHORIZED,
            "Multi-factor verification required".to_string(),
        ),
        AuthError::MissingRequiredClaim(_) | AuthError::UnverifiedSecret => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        AuthError::PolicyDenied(_) => (StatusCode::FORBIDDEN, "Access denied".to_string()),
        AuthError::TokenAcquisitionFailed(_) => (
            StatusCode::BAD_GATEWAY,
            "Upstream token acquisition failed".to_string(),
        ),
    };
    (status, message).into_response()
}
