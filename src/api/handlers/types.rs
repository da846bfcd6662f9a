//! Request/response types for auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::claims::Claim;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    /// ISO 8601 date, `YYYY-MM-DD`
    pub employment_date: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub user_id: String,
    /// Handed to the notifier for delivery; included here so callers without
    /// one can still complete confirmation.
    pub confirmation_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConfirmEmailRequest {
    pub email: String,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    /// `ok` for a full session, `mfa_required` for a challenge.
    pub status: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaVerifyRequest {
    pub code: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaEnrollStartResponse {
    pub secret: String,
    pub provisioning_uri: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaEnrollFinishRequest {
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ExternalCallbackRequest {
    pub provider: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub kind: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub mfa_enabled: bool,
    pub claims: Vec<Claim>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProfileUpdateRequest {
    pub department: Option<String>,
    pub position: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_defaults_remember_me() -> Result<()> {
        let decoded: LoginRequest =
            serde_json::from_str(r#"{"email":"a@example.com","password":"Password1"}"#)?;
        assert!(!decoded.remember_me);
        Ok(())
    }

    #[test]
    fn register_request_round_trips() -> Result<()> {
        let request = RegisterRequest {
            email: "alice@example.com".to_string(),
            password: "Password1".to_string(),
            username: Some("alice".to_string()),
            department: Some("HR".to_string()),
            position: None,
            employment_date: Some("2024-01-15".to_string()),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "alice@example.com");
        let decoded: RegisterRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.department.as_deref(), Some("HR"));
        Ok(())
    }
}
