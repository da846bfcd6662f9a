use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{debug, error, instrument};

use super::{
    auth_error_response,
    principal::require_full,
    session::{extract_session_token, token_cache_key},
};
use crate::auth::{
    error::AuthError,
    policy::{self, Decision},
    state::AuthState,
};

/// HR dashboard. Gated on the `HRManagerOnly` policy, then proxies the
/// headcount report from the resource service with a cached bearer token.
#[utoipa::path(
    get,
    path = "/v1/hr/dashboard",
    responses(
        (status = 200, description = "Headcount report"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Policy denied access"),
        (status = 502, description = "Resource service unavailable"),
    ),
    tag = "hr"
)]
#[instrument(skip_all)]
pub async fn dashboard(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let principal = match require_full(&headers, &state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let Some(session_token) = extract_session_token(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let snapshot = state.claims().claims_for(principal.user_id);
    if state.policies().evaluate(policy::HR_MANAGER_ONLY, &snapshot) == Decision::Deny {
        debug!("Policy {} denied {}", policy::HR_MANAGER_ONLY, principal.user_id);
        return auth_error_response(&AuthError::PolicyDenied(policy::HR_MANAGER_ONLY.to_string()));
    }

    let bearer = match state.tokens().get_token(&token_cache_key(&session_token)).await {
        Ok(bearer) => bearer,
        Err(err) => return auth_error_response(&err),
    };

    let url = format!(
        "{}/v1/reports/headcount",
        state.config().resource_base_url().trim_end_matches('/')
    );

    let response = match state
        .http()
        .get(&url)
        .bearer_auth(&bearer.access_token)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            error!("Headcount request failed: {err}");
            return (
                StatusCode::BAD_GATEWAY,
                "Resource service unavailable".to_string(),
            )
                .into_response();
        }
    };

    if !response.status().is_success() {
        error!("Headcount request returned {}", response.status());
        return (
            StatusCode::BAD_GATEWAY,
            "Resource service unavailable".to_string(),
        )
            .into_response();
    }

    match response.json::<serde_json::Value>().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => {
            error!("Headcount response was not JSON: {err}");
            (
                StatusCode::BAD_GATEWAY,
                "Resource service unavailable".to_string(),
            )
                .into_response()
        }
    }
}
