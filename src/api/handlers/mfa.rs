use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{info, instrument};

use super::{
    auth_error_response,
    principal::require_full,
    types::{MfaEnrollFinishRequest, MfaEnrollStartResponse},
};
use crate::auth::state::AuthState;

#[utoipa::path(
    post,
    path = "/v1/auth/mfa/enroll/start",
    responses(
        (status = 200, description = "Enrollment started", body = MfaEnrollStartResponse),
        (status = 401, description = "Not signed in"),
    ),
    tag = "mfa"
)]
#[instrument(skip_all)]
pub async fn enroll_start(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let principal = match require_full(&headers, &state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    match state.totp().enroll_begin(principal.user_id) {
        Ok(start) => Json(MfaEnrollStartResponse {
            secret: start.secret,
            provisioning_uri: start.provisioning_uri,
        })
        .into_response(),
        Err(err) => auth_error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/mfa/enroll/finish",
    request_body = MfaEnrollFinishRequest,
    responses(
        (status = 204, description = "Authenticator verified and enabled"),
        (status = 400, description = "No enrollment in progress"),
        (status = 401, description = "Code did not match"),
    ),
    tag = "mfa"
)]
#[instrument(skip_all)]
pub async fn enroll_finish(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<MfaEnrollFinishRequest>>,
) -> impl IntoResponse {
    let principal = match require_full(&headers, &state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match state.totp().enroll_confirm(principal.user_id, &request.code) {
        Ok(()) => {
            info!("MFA enabled for {}", principal.user_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => auth_error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/mfa/disable",
    responses(
        (status = 204, description = "Authenticator removed"),
        (status = 401, description = "Not signed in"),
    ),
    tag = "mfa"
)]
#[instrument(skip_all)]
pub async fn disable(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let principal = match require_full(&headers, &state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    match state.totp().disable(principal.user_id) {
        Ok(()) => {
            info!("MFA disabled for {}", principal.user_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => auth_error_response(&err),
    }
}
