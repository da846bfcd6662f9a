//! HTTP surface. Routes, middleware and the OpenAPI document.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post, put},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{
    clock::SystemClock,
    state::{AuthConfig, AuthState},
    token::HttpTokenClient,
};

pub(crate) mod handlers;
mod openapi;

/// Start the server.
///
/// # Errors
/// Returns an error if the listener cannot bind or the engine cannot be
/// assembled.
pub async fn new(port: u16, config: AuthConfig, token_client: HttpTokenClient) -> Result<()> {
    let state = Arc::new(AuthState::new(
        config,
        Arc::new(SystemClock),
        token_client,
    )?);

    let frontend_origin = frontend_origin(state.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/v1/auth/register", post(handlers::register::register))
        .route(
            "/v1/auth/confirm-email",
            post(handlers::register::confirm_email),
        )
        .route("/v1/auth/login", post(handlers::login::login))
        .route("/v1/auth/mfa/verify", post(handlers::login::verify_mfa))
        .route(
            "/v1/auth/mfa/enroll/start",
            post(handlers::mfa::enroll_start),
        )
        .route(
            "/v1/auth/mfa/enroll/finish",
            post(handlers::mfa::enroll_finish),
        )
        .route("/v1/auth/mfa/disable", post(handlers::mfa::disable))
        .route(
            "/v1/auth/external/callback",
            post(handlers::external::external_callback),
        )
        .route("/v1/auth/session", get(handlers::session::session))
        .route("/v1/auth/logout", post(handlers::session::logout))
        .route("/v1/me", get(handlers::profile::me))
        .route("/v1/me/profile", put(handlers::profile::update_profile))
        .route("/v1/hr/dashboard", get(handlers::hr::dashboard))
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
