use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use tracing::{debug, error, info, instrument};

use super::{
    types::{ConfirmEmailRequest, RegisterRequest, RegisterResponse},
    utils::{generate_confirmation_token, hash_confirmation_token, valid_email, valid_password},
};
use crate::auth::{
    claims::{self, Claim},
    constant_time_eq,
    error::StoreError,
    identity::{normalize_email, Identity},
    state::AuthState,
};

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = RegisterResponse),
        (status = 400, description = "Invalid email, password or employment date"),
        (status = 409, description = "An account with this email already exists"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    if !valid_password(&request.password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters and mix upper and lower case".to_string(),
        )
            .into_response();
    }

    let employment_date = match request.employment_date.as_deref() {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    "Invalid employment date, expected YYYY-MM-DD".to_string(),
                )
                    .into_response()
            }
        },
        None => None,
    };

    let username = request
        .username
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

    let confirmation_token = generate_confirmation_token();

    let mut identity = Identity::with_password(&username, &email, &request.password);
    identity.confirmation_token_hash = Some(hash_confirmation_token(&confirmation_token));
    let user_id = identity.id;

    if let Err(StoreError::DuplicateEmail) = state.identities().insert(identity) {
        return (
            StatusCode::CONFLICT,
            "An account with this email already exists".to_string(),
        )
            .into_response();
    }

    let mut seed = vec![];
    if let Some(department) = request.department.as_deref() {
        seed.push(Claim::new(claims::DEPARTMENT, department));
    }
    if let Some(position) = request.position.as_deref() {
        seed.push(Claim::new(claims::POSITION, position));
    }
    if let Some(date) = employment_date {
        seed.push(Claim::new(claims::EMPLOYMENT_DATE, &date.to_string()));
    }
    for claim in seed {
        if let Err(err) = state.claims().replace_claim(user_id, claim) {
            error!("Failed to seed claim for {user_id}: {err}");
        }
    }

    info!("Registered new account {user_id}");

    (
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user_id.to_string(),
            confirmation_token,
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/confirm-email",
    request_body = ConfirmEmailRequest,
    responses(
        (status = 204, description = "Email confirmed"),
        (status = 400, description = "Invalid confirmation token"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn confirm_email(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<ConfirmEmailRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let rejected =
        (StatusCode::BAD_REQUEST, "Invalid confirmation token".to_string()).into_response();

    let Some(identity) = state.identities().find_by_email(&request.email) else {
        return rejected;
    };

    let Some(stored) = identity.confirmation_token_hash.as_deref() else {
        debug!("No pending confirmation for {}", identity.id);
        return rejected;
    };

    let presented = hash_confirmation_token(&request.token);
    if !constant_time_eq(&presented, stored) {
        return rejected;
    }

    let updated = state.identities().update(identity.id, &mut |identity| {
        identity.email_confirmed = true;
        identity.confirmation_token_hash = None;
    });

    match updated {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(_) => rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{clock::SystemClock, state::AuthConfig, token::HttpTokenClient};
    use axum::body::to_bytes;
    use axum::http::header::SET_COOKIE;
    use secrecy::SecretString;

    fn test_state() -> Arc<AuthState> {
        let config = AuthConfig::new(
            "http://localhost:3000".to_string(),
            "http://localhost:8000".to_string(),
        );
        let client = HttpTokenClient::new(
            "http://localhost:9/token".to_string(),
            "client".to_string(),
            SecretString::from("secret".to_string()),
        )
        .unwrap();
        Arc::new(AuthState::new(config, Arc::new(SystemClock), client).unwrap())
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            username: None,
            department: Some("HR".to_string()),
            position: Some("Manager".to_string()),
            employment_date: Some("2023-01-15".to_string()),
        }
    }

    #[tokio::test]
    async fn register_rejects_missing_payload() {
        let response = register(Extension(test_state()), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let response = register(
            Extension(test_state()),
            Some(Json(request("not-an-email", "Password1"))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let response = register(
            Extension(test_state()),
            Some(Json(request("ana@example.com", "short"))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_bad_employment_date() {
        let mut payload = request("ana@example.com", "Password1");
        payload.employment_date = Some("15/01/2023".to_string());
        let response = register(Extension(test_state()), Some(Json(payload)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let state = test_state();
        let first = register(
            Extension(state.clone()),
            Some(Json(request("ana@example.com", "Password1"))),
        )
        .await
        .into_response();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = register(
            Extension(state),
            Some(Json(request("Ana@Example.com", "Password2"))),
        )
        .await
        .into_response();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_confirm_then_login() {
        use super::super::login::login;
        use super::super::types::{LoginRequest, LoginResponse};

        let state = test_state();
        let response = register(
            Extension(state.clone()),
            Some(Json(request("ana@example.com", "Password1"))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let registered: RegisterResponse = body_json(response).await;

        let login_payload = LoginRequest {
            email: "ana@example.com".to_string(),
            password: "Password1".to_string(),
            remember_me: false,
        };

        // Unconfirmed accounts cannot sign in yet.
        let early = login(Extension(state.clone()), Some(Json(login_payload)))
            .await
            .into_response();
        assert_eq!(early.status(), StatusCode::UNAUTHORIZED);

        let confirmed = confirm_email(
            Extension(state.clone()),
            Some(Json(ConfirmEmailRequest {
                email: "ana@example.com".to_string(),
                token: registered.confirmation_token,
            })),
        )
        .await
        .into_response();
        assert_eq!(confirmed.status(), StatusCode::NO_CONTENT);

        let login_payload = LoginRequest {
            email: "ana@example.com".to_string(),
            password: "Password1".to_string(),
            remember_me: false,
        };
        let signed_in = login(Extension(state), Some(Json(login_payload)))
            .await
            .into_response();
        assert_eq!(signed_in.status(), StatusCode::OK);
        assert!(signed_in.headers().contains_key(SET_COOKIE));
        let body: LoginResponse = body_json(signed_in).await;
        assert_eq!(body.status, "ok");
        assert!(!body.token.is_empty());
    }

    #[tokio::test]
    async fn confirm_rejects_wrong_token() {
        let state = test_state();
        let created = register(
            Extension(state.clone()),
            Some(Json(request("ana@example.com", "Password1"))),
        )
        .await
        .into_response();
        assert_eq!(created.status(), StatusCode::CREATED);

        let response = confirm_email(
            Extension(state),
            Some(Json(ConfirmEmailRequest {
                email: "ana@example.com".to_string(),
                token: "wrong".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
