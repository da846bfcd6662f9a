use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{error, instrument};

use super::{
    principal::require_full,
    types::{MeResponse, ProfileUpdateRequest},
};
use crate::auth::{
    claims::{self, Claim},
    state::AuthState,
};

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Profile of the signed-in account", body = MeResponse),
        (status = 401, description = "Not signed in"),
    ),
    tag = "profile"
)]
#[instrument(skip_all)]
pub async fn me(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let principal = match require_full(&headers, &state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let Some(identity) = state.identities().find_by_id(principal.user_id) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let snapshot = state.claims().claims_for(principal.user_id);

    Json(MeResponse {
        user_id: identity.id.to_string(),
        username: identity.username,
        email: identity.email,
        mfa_enabled: identity.mfa_enabled,
        claims: snapshot.claims().to_vec(),
    })
    .into_response()
}

#[utoipa::path(
    put,
    path = "/v1/me/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 204, description = "Profile updated"),
        (status = 401, description = "Not signed in"),
    ),
    tag = "profile"
)]
#[instrument(skip_all)]
pub async fn update_profile(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<ProfileUpdateRequest>>,
) -> impl IntoResponse {
    let principal = match require_full(&headers, &state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let mut updates = vec![];
    if let Some(department) = request.department.as_deref() {
        updates.push(Claim::new(claims::DEPARTMENT, department));
    }
    if let Some(position) = request.position.as_deref() {
        updates.push(Claim::new(claims::POSITION, position));
    }
    for claim in updates {
        if let Err(err) = state.claims().replace_claim(principal.user_id, claim) {
            error!("Failed to update claim for {}: {err}", principal.user_id);
        }
    }

    StatusCode::NO_CONTENT.into_response()
}
