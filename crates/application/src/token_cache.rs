use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use multibank_core::{AppError, AppResult, ProviderId};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::provider_ports::{HttpMethod, ProviderTransport};
use crate::provider_profile::ProviderProfile;

const TOKEN_PATH: &str = "/auth/bank-token";

/// Lifetime and clock-skew settings for cached bearer tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCachePolicy {
    /// Lifetime assumed when the token response omits `expires_in`.
    pub default_ttl: Duration,
    /// Subtracted from the lifetime to absorb clock skew and in-flight latency.
    /// Capped at half the lifetime so short-lived tokens are still cached.
    pub safety_margin: Duration,
}

impl Default for TokenCachePolicy {
    fn default() -> Self {
        Self {
            default_ttl: Duration::hours(24),
            safety_margin: Duration::hours(1),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug)]
struct CachedToken {
    bearer: String,
    expires_at: DateTime<Utc>,
}

/// Bearer token cache owned by one provider client.
///
/// The cached value is replaced wholesale on refresh. Concurrent refreshes may
/// both hit the token endpoint; the last one to finish is kept.
pub struct TokenCache {
    profile: Arc<ProviderProfile>,
    transport: Arc<dyn ProviderTransport>,
    policy: TokenCachePolicy,
    current: RwLock<Option<Arc<CachedToken>>>,
}

impl TokenCache {
    /// Creates an empty token cache.
    #[must_use]
    pub fn new(
        profile: Arc<ProviderProfile>,
        transport: Arc<dyn ProviderTransport>,
        policy: TokenCachePolicy,
    ) -> Self {
        Self {
            profile,
            transport,
            policy,
            current: RwLock::new(None),
        }
    }

    /// Returns a bearer token that is valid now, exchanging credentials when needed.
    pub async fn bearer(&self) -> AppResult<String> {
        let now = Utc::now();
        if let Some(cached) = self.current.read().await.as_ref()
            && now < cached.expires_at
        {
            return Ok(cached.bearer.clone());
        }

        let fresh = Arc::new(self.exchange(now).await?);
        let bearer = fresh.bearer.clone();
        *self.current.write().await = Some(fresh);

        Ok(bearer)
    }

    /// Drops the cached token so the next call performs a fresh exchange.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }

    async fn exchange(&self, issued_at: DateTime<Utc>) -> AppResult<CachedToken> {
        let provider = self.profile.provider;
        let request = self
            .profile
            .request(HttpMethod::Post, TOKEN_PATH)
            .with_query("client_id", self.profile.credentials.client_id.clone())
            .with_query("client_secret", self.profile.credentials.client_secret.clone());

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|error| token_error(provider, error.to_string()))?;

        let token: TokenResponse = serde_json::from_value(response.body).map_err(|error| {
            token_error(provider, format!("invalid token response: {error}"))
        })?;

        let bearer = token
            .access_token
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| token_error(provider, "token response has no access_token".to_owned()))?;

        let ttl = token
            .expires_in
            .filter(|seconds| *seconds > 0)
            .map_or(self.policy.default_ttl, Duration::seconds);
        let margin = self.policy.safety_margin.min(ttl / 2);
        let expires_at = issued_at + ttl - margin;

        info!(provider = %provider, expires_at = %expires_at, "acquired provider bearer token");
        debug!(provider = %provider, ttl_seconds = ttl.num_seconds(), "token lifetime");

        Ok(CachedToken { bearer, expires_at })
    }
}

fn token_error(provider: ProviderId, message: String) -> AppError {
    AppError::TokenAcquisition { provider, message }
}
