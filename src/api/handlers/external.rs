use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, instrument};

use super::{
    auth_error_response,
    login::signed_in_response,
    types::{ExternalCallbackRequest, LoginResponse},
};
use crate::auth::{federation::ExternalAssertion, state::AuthState};

#[utoipa::path(
    post,
    path = "/v1/auth/external/callback",
    request_body = ExternalCallbackRequest,
    responses(
        (status = 200, description = "Signed in via external provider", body = LoginResponse),
        (status = 400, description = "Assertion is missing a required claim"),
        (status = 423, description = "Account is locked out"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn external_callback(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<ExternalCallbackRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let assertion = ExternalAssertion {
        provider: request.provider,
        email: request.email,
        display_name: request.name,
    };

    match state.federation().complete_external_login(&assertion) {
        Ok(session) => {
            info!("External sign-in completed via {}", assertion.provider);
            signed_in_response(&state, session)
        }
        Err(err) => auth_error_response(&err),
    }
}
