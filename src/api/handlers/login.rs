use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::instrument;

use super::{
    auth_error_response,
    principal::require_challenge,
    session::session_cookie,
    types::{LoginRequest, LoginResponse, MfaVerifyRequest},
};
use crate::auth::{identity::normalize_email, signin::SignIn, state::AuthState};

/// Attach the session cookie and return the issued token in the body for
/// clients that prefer bearer authentication.
pub(super) fn signed_in_response(
    state: &AuthState,
    session: crate::auth::session::IssuedSession,
) -> Response {
    let body = Json(LoginResponse {
        status: "ok".to_string(),
        token: session.token.clone(),
        expires_at: session.expires_at,
    });

    let mut headers = HeaderMap::new();
    if let Ok(cookie) = session_cookie(state.config(), &session.token) {
        headers.insert(SET_COOKIE, cookie);
    }

    (StatusCode::OK, headers, body).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in, or a second factor is required", body = LoginResponse),
        (status = 401, description = "Failed to login"),
        (status = 423, description = "Account is locked out"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);

    match state
        .signin()
        .password_sign_in(&email, &request.password, request.remember_me)
    {
        Ok(SignIn::Authenticated(session)) => signed_in_response(&state, session),
        Ok(SignIn::RequiresMfa { challenge }) => Json(LoginResponse {
            status: "mfa_required".to_string(),
            token: challenge.token,
            expires_at: challenge.expires_at,
        })
        .into_response(),
        Err(err) => auth_error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/mfa/verify",
    request_body = MfaVerifyRequest,
    responses(
        (status = 200, description = "Second factor accepted", body = LoginResponse),
        (status = 401, description = "Failed to login"),
        (status = 423, description = "Account is locked out"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_mfa(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<MfaVerifyRequest>>,
) -> impl IntoResponse {
    let challenge_token = match require_challenge(&headers, &state) {
        Ok(token) => token,
        Err(response) => return response,
    };

    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match state
        .signin()
        .verify_mfa(&challenge_token, &request.code, request.remember_me)
    {
        Ok(SignIn::Authenticated(session)) => signed_in_response(&state, session),
        Ok(SignIn::RequiresMfa { .. }) => {
            auth_error_response(&crate::auth::error::AuthError::MfaRequired)
        }
        Err(err) => auth_error_response(&err),
    }
}
