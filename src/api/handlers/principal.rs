//! Authenticated principal extraction.
//!
//! Handlers that need a signed-in user go through `require_full`; the MFA
//! verification endpoint accepts challenge sessions via `require_challenge`.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::auth_error_response;
use super::session::extract_session_token;
use crate::auth::error::AuthError;
use crate::auth::session::SessionKind;
use crate::auth::state::AuthState;

/// Authenticated user context derived from the session token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: uuid::Uuid,
    pub email: String,
}

/// Resolve a full session into a principal.
///
/// Challenge sessions are told to finish MFA first; anything else is a plain
/// 401.
pub fn require_full(headers: &HeaderMap, state: &AuthState) -> Result<Principal, Response> {
    let (principal, kind) = resolve(headers, state)?;
    match kind {
        SessionKind::Full => Ok(principal),
        SessionKind::MfaChallenge => Err(auth_error_response(&AuthError::MfaRequired)),
    }
}

/// Resolve a challenge session token for MFA verification.
pub fn require_challenge(headers: &HeaderMap, state: &AuthState) -> Result<String, Response> {
    let Some(token) = extract_session_token(headers) else {
        return Err(StatusCode::UNAUTHORIZED.into_response());
    };
    match state.sessions().lookup(&token) {
        Some(record) if record.kind == SessionKind::MfaChallenge => Ok(token),
        _ => Err(StatusCode::UNAUTHORIZED.into_response()),
    }
}

fn resolve(headers: &HeaderMap, state: &AuthState) -> Result<(Principal, SessionKind), Response> {
    let Some(token) = extract_session_token(headers) else {
        return Err(StatusCode::UNAUTHORIZED.into_response());
    };
    let Some(record) = state.sessions().lookup(&token) else {
        return Err(StatusCode::UNAUTHORIZED.into_response());
    };
    let Some(identity) = state.identities().find_by_id(record.user_id) else {
        return Err(StatusCode::UNAUTHORIZED.into_response());
    };
    Ok((
        Principal {
            user_id: record.user_id,
            email: identity.email,
        },
        record.kind,
    ))
}
