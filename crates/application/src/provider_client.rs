use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use multibank_core::{AppError, AppResult, ClientId, ProviderId};
use multibank_domain::{
    Account, AccountClosure, Amount, Card, DomainEvent, NewAccount, NewCard, PAN_SCHEME,
    PaymentOrder, Product, ProductClosure, ProductPurchase, Transaction,
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::consent_service::{ConsentPolicy, ConsentService};
use crate::payload;
use crate::provider_ports::{
    AccountSource, ConsentStore, DomainEventPublisher, HttpMethod, ProviderTransport,
    UpstreamRequest,
};
use crate::provider_profile::ProviderProfile;
use crate::token_cache::{TokenCache, TokenCachePolicy};

mod accounts;
mod cards;
mod normalize;
mod payments;
mod products;

pub use normalize::{
    DEFAULT_CARD_VALIDITY_DAYS, OpenBankingNormalizer, PayloadNormalizer, UNKNOWN_FIELD_VALUE,
};

/// Client for one provider's REST surface.
///
/// Shares token and consent handling across providers; only the
/// [`ProviderProfile`] and the [`PayloadNormalizer`] differ between instances.
#[derive(Clone)]
pub struct ProviderClient {
    profile: Arc<ProviderProfile>,
    transport: Arc<dyn ProviderTransport>,
    tokens: Arc<TokenCache>,
    consents: ConsentService,
    normalizer: Arc<dyn PayloadNormalizer>,
    events: Arc<dyn DomainEventPublisher>,
}

impl ProviderClient {
    /// Creates a provider client with the Open Banking normalizer.
    #[must_use]
    pub fn new(
        profile: ProviderProfile,
        transport: Arc<dyn ProviderTransport>,
        consent_store: Arc<dyn ConsentStore>,
        events: Arc<dyn DomainEventPublisher>,
        token_policy: TokenCachePolicy,
        consent_policy: ConsentPolicy,
    ) -> Self {
        let profile = Arc::new(profile);
        let tokens = Arc::new(TokenCache::new(
            profile.clone(),
            transport.clone(),
            token_policy,
        ));
        let consents = ConsentService::new(
            profile.clone(),
            transport.clone(),
            tokens.clone(),
            consent_store,
            consent_policy,
        );

        Self {
            profile,
            transport,
            tokens,
            consents,
            normalizer: Arc::new(OpenBankingNormalizer),
            events,
        }
    }

    /// Replaces the payload normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn PayloadNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Returns the provider identity.
    #[must_use]
    pub fn provider(&self) -> ProviderId {
        self.profile.provider
    }

    /// Returns the consent manager of this provider.
    #[must_use]
    pub fn consents(&self) -> &ConsentService {
        &self.consents
    }

    /// Starts an authenticated request without any consent header.
    async fn authorized(&self, method: HttpMethod, path: impl Into<String>) -> AppResult<UpstreamRequest> {
        let bearer = self.tokens.bearer().await?;
        Ok(self.profile.request(method, path).with_bearer(bearer))
    }

    /// Starts a request carrying an account consent.
    async fn under_account_consent(
        &self,
        method: HttpMethod,
        path: impl Into<String>,
        consent_id: &str,
    ) -> AppResult<UpstreamRequest> {
        Ok(self
            .authorized(method, path)
            .await?
            .with_header("x-consent-id", consent_id)
            .with_header("x-requesting-bank", self.profile.requesting_bank()))
    }

    /// Starts a client-scoped request carrying a product-agreement consent.
    async fn under_product_consent(
        &self,
        method: HttpMethod,
        path: impl Into<String>,
        client_id: &ClientId,
        consent_id: &str,
    ) -> AppResult<UpstreamRequest> {
        Ok(self
            .authorized(method, path)
            .await?
            .with_query("client_id", client_id.as_str())
            .with_header("client_id", client_id.as_str())
            .with_header("x-product-agreement-consent-id", consent_id)
            .with_header("x-requesting-bank", self.profile.requesting_bank()))
    }

    /// Executes a request. A 401 drops the cached token so the next call
    /// exchanges a fresh one.
    async fn send(&self, request: UpstreamRequest) -> AppResult<Value> {
        match self.transport.execute(request).await {
            Ok(response) => Ok(response.body),
            Err(error) => {
                if matches!(error, AppError::Provider { status: Some(401), .. }) {
                    warn!(provider = %self.provider(), "bearer token rejected, invalidating cache");
                    self.tokens.invalidate().await;
                }
                Err(error)
            }
        }
    }

    fn map_list<T>(
        &self,
        items: Vec<&Value>,
        map: impl Fn(&Value) -> AppResult<T>,
    ) -> AppResult<Vec<T>> {
        items.into_iter().map(map).collect()
    }

    fn missing_data(&self, record: &str) -> AppError {
        AppError::Mapping {
            provider: self.provider(),
            message: format!("{record} response has no data"),
        }
    }

    fn publish(&self, event: DomainEvent) {
        self.events.publish(event);
    }
}

#[async_trait]
impl AccountSource for ProviderClient {
    fn provider(&self) -> ProviderId {
        self.profile.provider
    }

    async fn fetch_accounts(&self, client_id: &ClientId) -> AppResult<Vec<Account>> {
        ProviderClient::fetch_accounts(self, client_id).await
    }
}

#[cfg(test)]
mod tests;
