//! Bearer credential broker for the authenticated upstream.
//!
//! Provides a thread-safe, async-aware token cache with:
//! - Client-credentials exchange over HTTP Basic auth
//! - A fixed validity horizon, independent of what the upstream reports
//! - Single-flight refresh so concurrent callers share one exchange

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::config::ClientCredentials;
use crate::error::AuthError;
use crate::metrics::record_credential_refresh;

/// Form body of the client-credentials grant.
const GRANT_BODY: &str = "grant_type=client_credentials";

/// Content type expected by the token endpoint.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Cached token with expiration tracking.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Owns the process-wide bearer credential.
pub struct CredentialBroker {
    http: Client,
    token_url: String,
    credentials: Option<ClientCredentials>,
    ttl: Duration,
    cache: RwLock<Option<CachedToken>>,
}

impl CredentialBroker {
    pub fn new(
        http: Client,
        token_url: impl Into<String>,
        credentials: Option<ClientCredentials>,
        ttl: Duration,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            credentials,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call re-exchanges.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Get a valid bearer token, exchanging credentials if necessary.
    ///
    /// - Fast path: return cached token while it is valid
    /// - Slow path: take the write lock, double-check, then exchange
    pub async fn get_token(&self) -> Result<String, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        match self.exchange().await {
            Ok(access_token) => {
                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at: Instant::now() + self.ttl,
                });
                record_credential_refresh(true);
                debug!(ttl_secs = self.ttl.as_secs(), "Exchanged client credentials for bearer token");
                Ok(access_token)
            }
            Err(e) => {
                record_credential_refresh(false);
                error!("Failed to obtain bearer token: {}", e);
                Err(e)
            }
        }
    }

    async fn exchange(&self) -> Result<String, AuthError> {
        let credentials = self.credentials.as_ref().ok_or(AuthError::MissingCredentials)?;

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(GRANT_BODY)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        body.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidResponse("missing access_token".to_string()))
    }
}
