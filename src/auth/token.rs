//! Bearer tokens for the downstream resource server, cached per session.
//!
//! Each cache key owns one slot. The first caller to find the slot without a
//! live token becomes the leader and runs the upstream exchange; everyone who
//! arrives while the exchange is in flight waits on the same result, success
//! or failure. Failed exchanges are never cached for later callers.

use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use super::clock::Clock;
use super::error::AuthError;

/// Wire format of the resource server's token endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BearerToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Credential exchange against the token endpoint.
pub trait TokenClient: Send + Sync {
    fn exchange(&self) -> impl Future<Output = Result<BearerToken, AuthError>> + Send;
}

/// Client-credentials exchange over HTTP.
pub struct HttpTokenClient {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
}

impl HttpTokenClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        token_url: String,
        client_id: String,
        client_secret: SecretString,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(crate::APP_USER_AGENT).build()?;
        Ok(Self {
            client,
            token_url,
            client_id,
            client_secret,
        })
    }
}

impl TokenClient for HttpTokenClient {
    async fn exchange(&self) -> Result<BearerToken, AuthError> {
        let payload = json!({
            "client_id": self.client_id,
            "client_secret": self.client_secret.expose_secret(),
        });

        debug!("Token exchange against {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| AuthError::TokenAcquisitionFailed(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::TokenAcquisitionFailed(format!(
                "{} - {}",
                self.token_url,
                response.status()
            )));
        }

        response
            .json::<BearerToken>()
            .await
            .map_err(|err| AuthError::TokenAcquisitionFailed(err.to_string()))
    }
}

type ExchangeOutcome = Option<Result<BearerToken, AuthError>>;

/// Cache slot for one key: the stored token plus, while a refresh is running,
/// a channel the leader resolves for every waiter.
#[derive(Default)]
struct Slot {
    cached: Option<BearerToken>,
    inflight: Option<watch::Receiver<ExchangeOutcome>>,
}

/// Per-key token cache with single-flight refresh.
pub struct TokenCache<C> {
    client: C,
    clock: Arc<dyn Clock>,
    refresh_timeout: Duration,
    slots: Mutex<HashMap<String, Arc<Mutex<Slot>>>>,
}

impl<C: TokenClient> TokenCache<C> {
    #[must_use]
    pub fn new(client: C, clock: Arc<dyn Clock>, refresh_timeout: Duration) -> Self {
        Self {
            client,
            clock,
            refresh_timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return a live token for the key, refreshing it first if the cached one
    /// is missing or expired. An expired token is never returned.
    ///
    /// One refresh runs per expiry event: the leader's result, error
    /// included, is handed to every caller that was waiting on it.
    pub async fn get_token(&self, key: &str) -> Result<BearerToken, AuthError> {
        let slot = self.slot(key).await;

        loop {
            let mut entry = slot.lock().await;
            if let Some(token) = entry.cached.as_ref() {
                if token.expires_at > self.clock.now() {
                    return Ok(token.clone());
                }
            }

            // Clear a channel whose leader was cancelled before resolving it,
            // so the next caller can take over.
            let abandoned = entry
                .inflight
                .as_ref()
                .is_some_and(|rx| rx.has_changed().is_err() && rx.borrow().is_none());
            if abandoned {
                entry.inflight = None;
            }

            if let Some(rx) = entry.inflight.as_ref() {
                let mut rx = rx.clone();
                drop(entry);
                if let Ok(outcome) = rx.wait_for(Option::is_some).await {
                    if let Some(result) = outcome.clone() {
                        return result;
                    }
                }
                continue;
            }

            let (tx, rx) = watch::channel(None);
            entry.inflight = Some(rx);
            drop(entry);

            let result = match tokio::time::timeout(self.refresh_timeout, self.client.exchange())
                .await
            {
                Ok(result) => result,
                Err(_) => Err(AuthError::TokenAcquisitionFailed(
                    "timed out waiting for token endpoint".to_string(),
                )),
            };

            let mut entry = slot.lock().await;
            entry.inflight = None;
            if let Ok(token) = &result {
                entry.cached = Some(token.clone());
            }
            drop(entry);

            let _ = tx.send(Some(result.clone()));
            return result;
        }
    }

    /// Drop the cached token for a key, if any.
    pub async fn invalidate(&self, key: &str) {
        let mut slots = self.slots.lock().await;
        slots.remove(key);
    }

    /// Fetch or create the slot for a key, dropping idle slots whose token
    /// has expired along the way so sessions that never log out do not pin
    /// entries forever.
    async fn slot(&self, key: &str) -> Arc<Mutex<Slot>> {
        let mut slots = self.slots.lock().await;
        let now = self.clock.now();
        slots.retain(|slot_key, slot| {
            if slot_key == key || Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(state) => {
                    state.inflight.is_some()
                        || state
                            .cached
                            .as_ref()
                            .is_some_and(|token| token.expires_at > now)
                }
                Err(_) => true,
            }
        });
        slots.entry(key.to_string()).or_default().clone()
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.slots.lock().await.len()
    }
}
