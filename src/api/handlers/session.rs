//! Session endpoints for cookie and bearer auth.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::sync::Arc;

use super::types::SessionResponse;
use crate::auth::session::{hash_session_token, SessionKind};
use crate::auth::state::{AuthConfig, AuthState};

const SESSION_COOKIE_NAME: &str = "tessera_session";

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Missing cookies are treated as "no session" to avoid leaking auth state.
    let Some(token) = extract_session_token(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let Some(record) = state.sessions().lookup(&token) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let Some(identity) = state.identities().find_by_id(record.user_id) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let kind = match record.kind {
        SessionKind::Full => "full",
        SessionKind::MfaChallenge => "mfa_challenge",
    };
    let response = SessionResponse {
        user_id: record.user_id.to_string(),
        email: identity.email,
        kind: kind.to_string(),
        expires_at: record.expires_at,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        state.sessions().remove(&token);
        // Drop any downstream bearer token tied to this session
        state.tokens().invalidate(&token_cache_key(&token)).await;
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Cache key for downstream bearer tokens: one per signed-in session.
pub(super) fn token_cache_key(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(hash_session_token(token))
}

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
            continue;
        };
        if key.trim() == SESSION_COOKIE_NAME {
            return Some(val.trim().to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_session_token_prefers_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("tessera_session=fromcookie"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_session_token_reads_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("other=1; tessera_session=fromcookie; more=2"),
        );
        assert_eq!(
            extract_session_token(&headers),
            Some("fromcookie".to_string())
        );
    }

    #[test]
    fn extract_bearer_token_rejects_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn session_cookie_respects_frontend_scheme() {
        let secure_config = AuthConfig::new(
            "https://app.tessera.dev".to_string(),
            "https://resource.tessera.dev".to_string(),
        );
        let cookie = session_cookie(&secure_config, "token").unwrap();
        assert!(cookie.to_str().unwrap().contains("; Secure"));

        let plain_config = AuthConfig::new(
            "http://localhost:3000".to_string(),
            "http://localhost:9000".to_string(),
        );
        let cookie = session_cookie(&plain_config, "token").unwrap();
        assert!(!cookie.to_str().unwrap().contains("; Secure"));
        assert!(cookie.to_str().unwrap().starts_with("tessera_session=token"));
    }

    #[test]
    fn token_cache_key_is_stable_and_opaque() {
        assert_eq!(token_cache_key("token"), token_cache_key("token"));
        assert_ne!(token_cache_key("token"), token_cache_key("other"));
        assert!(!token_cache_key("token").contains("token"));
    }
}
