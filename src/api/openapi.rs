use utoipa::OpenApi;

use super::handlers;
use crate::auth::claims::Claim;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::register::register,
        handlers::register::confirm_email,
        handlers::login::login,
        handlers::login::verify_mfa,
        handlers::mfa::enroll_start,
        handlers::mfa::enroll_finish,
        handlers::mfa::disable,
        handlers::external::external_callback,
        handlers::session::session,
        handlers::session::logout,
        handlers::profile::me,
        handlers::profile::update_profile,
        handlers::hr::dashboard,
    ),
    components(schemas(
        Claim,
        handlers::types::RegisterRequest,
        handlers::types::RegisterResponse,
        handlers::types::ConfirmEmailRequest,
        handlers::types::LoginRequest,
        handlers::types::LoginResponse,
        handlers::types::MfaVerifyRequest,
        handlers::types::MfaEnrollStartResponse,
        handlers::types::MfaEnrollFinishRequest,
        handlers::types::ExternalCallbackRequest,
        handlers::types::SessionResponse,
        handlers::types::MeResponse,
        handlers::types::ProfileUpdateRequest,
    )),
    tags(
        (name = "auth", description = "Registration, sign-in and federation"),
        (name = "mfa", description = "Authenticator enrollment"),
        (name = "profile", description = "Account profile"),
        (name = "hr", description = "Policy-gated HR endpoints"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
