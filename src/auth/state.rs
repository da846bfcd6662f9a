//! Auth configuration and shared server state.

use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::claims::{ClaimStore, InMemoryClaimStore};
use super::clock::Clock;
use super::federation::FederationAdapter;
use super::identity::{IdentityStore, InMemoryIdentityStore};
use super::policy::PolicyEvaluator;
use super::session::SessionStore;
use super::signin::SignInOrchestrator;
use super::token::{HttpTokenClient, TokenCache};
use super::totp::TotpEngine;

const DEFAULT_ISSUER: &str = "Tessera";
const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_REMEMBER_ME_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_CHALLENGE_TTL_SECONDS: i64 = 5 * 60;
const DEFAULT_LOCKOUT_MINUTES: i64 = 15;
const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_MFA_DIGITS: usize = 6;
const DEFAULT_MFA_STEP_SECONDS: u64 = 30;
const DEFAULT_TOKEN_REFRESH_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    issuer: String,
    frontend_base_url: String,
    resource_base_url: String,
    session_ttl_seconds: i64,
    remember_me_ttl_seconds: i64,
    challenge_ttl_seconds: i64,
    lockout_minutes: i64,
    max_failed_attempts: u32,
    mfa_digits: usize,
    mfa_step_seconds: u64,
    token_refresh_timeout_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String, resource_base_url: String) -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            frontend_base_url,
            resource_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            remember_me_ttl_seconds: DEFAULT_REMEMBER_ME_TTL_SECONDS,
            challenge_ttl_seconds: DEFAULT_CHALLENGE_TTL_SECONDS,
            lockout_minutes: DEFAULT_LOCKOUT_MINUTES,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            mfa_digits: DEFAULT_MFA_DIGITS,
            mfa_step_seconds: DEFAULT_MFA_STEP_SECONDS,
            token_refresh_timeout_seconds: DEFAULT_TOKEN_REFRESH_TIMEOUT_SECONDS,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_remember_me_ttl_seconds(mut self, seconds: i64) -> Self {
        self.remember_me_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_challenge_ttl_seconds(mut self, seconds: i64) -> Self {
        self.challenge_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lockout_minutes(mut self, minutes: i64) -> Self {
        self.lockout_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_token_refresh_timeout_seconds(mut self, seconds: u64) -> Self {
        self.token_refresh_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn resource_base_url(&self) -> &str {
        &self.resource_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn remember_me_ttl_seconds(&self) -> i64 {
        self.remember_me_ttl_seconds
    }

    #[must_use]
    pub fn challenge_ttl_seconds(&self) -> i64 {
        self.challenge_ttl_seconds
    }

    #[must_use]
    pub fn lockout_minutes(&self) -> i64 {
        self.lockout_minutes
    }

    #[must_use]
    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    #[must_use]
    pub fn mfa_digits(&self) -> usize {
        self.mfa_digits
    }

    #[must_use]
    pub fn mfa_step_seconds(&self) -> u64 {
        self.mfa_step_seconds
    }

    #[must_use]
    pub fn token_refresh_timeout_seconds(&self) -> u64 {
        self.token_refresh_timeout_seconds
    }

    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Everything the API handlers share, wired once at startup.
pub struct AuthState {
    config: AuthConfig,
    identities: Arc<dyn IdentityStore>,
    claims: Arc<dyn ClaimStore>,
    sessions: Arc<SessionStore>,
    totp: Arc<TotpEngine>,
    signin: SignInOrchestrator,
    federation: FederationAdapter,
    policies: PolicyEvaluator,
    tokens: TokenCache<HttpTokenClient>,
    http: Client,
}

impl AuthState {
    /// Assemble the engine around in-memory adapters and the given clock.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: AuthConfig,
        clock: Arc<dyn Clock>,
        token_client: HttpTokenClient,
    ) -> Result<Self> {
        let identities: Arc<dyn IdentityStore> = Arc::new(InMemoryIdentityStore::new());
        let claims: Arc<dyn ClaimStore> = Arc::new(InMemoryClaimStore::new());
        let sessions = Arc::new(SessionStore::new(clock.clone()));
        let totp = Arc::new(TotpEngine::new(
            identities.clone(),
            clock.clone(),
            config.issuer().to_string(),
            config.mfa_digits(),
            config.mfa_step_seconds(),
        ));
        let signin = SignInOrchestrator::new(
            identities.clone(),
            sessions.clone(),
            totp.clone(),
            clock.clone(),
            config.clone(),
        );
        let federation = FederationAdapter::new(
            identities.clone(),
            sessions.clone(),
            clock.clone(),
            config.session_ttl_seconds(),
        );
        let policies = PolicyEvaluator::standard(clock.clone());
        let tokens = TokenCache::new(
            token_client,
            clock,
            Duration::from_secs(config.token_refresh_timeout_seconds()),
        );
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            identities,
            claims,
            sessions,
            totp,
            signin,
            federation,
            policies,
            tokens,
            http,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn identities(&self) -> &dyn IdentityStore {
        self.identities.as_ref()
    }

    #[must_use]
    pub fn claims(&self) -> &dyn ClaimStore {
        self.claims.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[must_use]
    pub fn totp(&self) -> &TotpEngine {
        &self.totp
    }

    #[must_use]
    pub fn signin(&self) -> &SignInOrchestrator {
        &self.signin
    }

    #[must_use]
    pub fn federation(&self) -> &FederationAdapter {
        &self.federation
    }

    #[must_use]
    pub fn policies(&self) -> &PolicyEvaluator {
        &self.policies
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenCache<HttpTokenClient> {
        &self.tokens
    }

    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::SystemClock;
    use secrecy::SecretString;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new(
            "https://app.tessera.dev".to_string(),
            "https://resource.tessera.dev".to_string(),
        );

        assert_eq!(config.issuer(), DEFAULT_ISSUER);
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(config.lockout_minutes(), DEFAULT_LOCKOUT_MINUTES);
        assert_eq!(config.max_failed_attempts(), DEFAULT_MAX_FAILED_ATTEMPTS);
        assert_eq!(config.mfa_digits(), DEFAULT_MFA_DIGITS);
        assert_eq!(config.mfa_step_seconds(), DEFAULT_MFA_STEP_SECONDS);
        assert!(config.session_cookie_secure());

        let config = config
            .with_issuer("Example".to_string())
            .with_session_ttl_seconds(60)
            .with_remember_me_ttl_seconds(120)
            .with_challenge_ttl_seconds(30)
            .with_lockout_minutes(1)
            .with_max_failed_attempts(3)
            .with_token_refresh_timeout_seconds(2);

        assert_eq!(config.issuer(), "Example");
        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.remember_me_ttl_seconds(), 120);
        assert_eq!(config.challenge_ttl_seconds(), 30);
        assert_eq!(config.lockout_minutes(), 1);
        assert_eq!(config.max_failed_attempts(), 3);
        assert_eq!(config.token_refresh_timeout_seconds(), 2);
    }

    #[test]
    fn plain_http_frontend_disables_secure_cookies() {
        let config = AuthConfig::new(
            "http://localhost:3000".to_string(),
            "http://localhost:9000".to_string(),
        );
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn auth_state_assembles() {
        let config = AuthConfig::new(
            "http://localhost:3000".to_string(),
            "http://localhost:9000".to_string(),
        );
        let client = HttpTokenClient::new(
            "http://localhost:9000/v1/auth/token".to_string(),
            "tessera".to_string(),
            SecretString::from("secret".to_string()),
        )
        .unwrap();
        let state = AuthState::new(config, Arc::new(SystemClock), client).unwrap();
        assert_eq!(state.config().issuer(), DEFAULT_ISSUER);
    }
}
