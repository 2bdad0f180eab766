//! Client-credentials token acquisition with caching and backoff.

use std::error::Error as StdError;
use std::sync::Arc;

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{BackoffPolicy, Credential, CredentialStore, Sleeper, TokioSleeper, DEFAULT_TTL_SECS};
use crate::clock::{Clock, SystemClock};
use crate::config::MessagingConfig;
use crate::error::{credential_error, CredentialErrorKind, Error, ErrorKind};

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Hands out the messaging provider's service token, fetching it on demand.
///
/// The steady state is a read of the in-memory store. On a miss, a single refresh
/// runs under `refresh_lock`; callers arriving during the refresh wait for it and
/// then read the fresh credential instead of issuing their own request.
pub struct CredentialClient {
    http_client: reqwest::Client,
    config: MessagingConfig,
    store: CredentialStore,
    backoff: BackoffPolicy,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    refresh_lock: Mutex<()>,
}

impl CredentialClient {
    /// Create a client on the system clock with the default backoff policy.
    pub fn new(http_client: reqwest::Client, config: MessagingConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            http_client,
            config,
            store: CredentialStore::new(clock.clone()),
            backoff: BackoffPolicy::default(),
            clock,
            sleeper: Arc::new(TokioSleeper),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Use `clock` for expiry decisions. Drops any cached credential.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.store = CredentialStore::new(clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Get a valid service token, fetching a new one if the cached one is absent or expired.
    ///
    /// Transient failures are retried per the backoff policy. When every attempt fails the
    /// error kind is `RetriesExhausted` and its source is the last attempt's error.
    pub async fn acquire_token(&self) -> Result<SecretString, Error> {
        if let Some(credential) = self.store.get() {
            return Ok(credential.token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(credential) = self.store.get() {
            debug!("Service token was refreshed by another request");
            return Ok(credential.token);
        }

        let max_retries = self.backoff.max_attempts();
        let mut last_error: Option<Error> = None;

        for attempt in 0..=max_retries {
            match self.request_token().await {
                Ok(credential) => {
                    info!(
                        "Acquired messaging service token, valid until {}",
                        credential.expires_at
                    );
                    let token = credential.token.clone();
                    self.store.set(credential);
                    return Ok(token);
                }
                Err(err) => {
                    warn!(
                        "Service token request failed (attempt {} of {}): {}",
                        attempt + 1,
                        max_retries + 1,
                        err
                    );
                    self.store.invalidate();
                    if attempt < max_retries {
                        let delay = self.backoff.delay_for_attempt(attempt);
                        debug!("Retrying service token request in {:?}", delay);
                        self.sleeper.sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(Error {
            source: last_error.map(|e| Box::new(e) as Box<dyn StdError + Send + Sync>),
            error_kind: ErrorKind::Credential(CredentialErrorKind::RetriesExhausted),
        })
    }

    /// Discard the cached credential, e.g. after the provider rejected it.
    pub fn invalidate(&self) {
        debug!("Invalidating cached messaging service token");
        self.store.invalidate();
    }

    /// The cached credential, if still valid.
    pub fn current(&self) -> Option<Credential> {
        self.store.get()
    }

    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// One round-trip to the token endpoint.
    async fn request_token(&self) -> Result<Credential, Error> {
        let body = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.config.client_id,
            client_secret: self.config.client_secret.expose_secret(),
        };

        let response = self
            .http_client
            .post(self.config.token_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Credential(CredentialErrorKind::NetworkFailure),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(credential_error(
                CredentialErrorKind::NetworkFailure,
                &format!("Token endpoint returned {}: {}", status, error_text),
            ));
        }

        let payload: TokenResponse = response.json().await.map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Credential(CredentialErrorKind::MalformedResponse),
        })?;

        let token = payload
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                credential_error(
                    CredentialErrorKind::MalformedResponse,
                    "Token response carried no access_token",
                )
            })?;
        let expires_in = payload.expires_in.unwrap_or(DEFAULT_TTL_SECS);
        let ttl = Duration::try_seconds(expires_in).ok_or_else(|| {
            credential_error(
                CredentialErrorKind::MalformedResponse,
                &format!("Token response carried an unusable expires_in: {}", expires_in),
            )
        })?;

        Credential::issued(SecretString::new(token), self.clock.now(), ttl)
    }
}
