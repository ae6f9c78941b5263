use std::collections::BTreeMap;
use std::sync::Arc;

use multibank_core::{AppError, AppResult, ProviderId};

use crate::provider_client::ProviderClient;
use crate::provider_ports::AccountSource;

/// Lookup of the configured provider clients by provider identity.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: BTreeMap<ProviderId, Arc<ProviderClient>>,
}

impl ProviderRegistry {
    /// Creates a registry from provider clients. A later client for the same
    /// provider replaces an earlier one.
    #[must_use]
    pub fn new(clients: impl IntoIterator<Item = ProviderClient>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|client| (client.provider(), Arc::new(client)))
                .collect(),
        }
    }

    /// Returns the client of one provider.
    pub fn client(&self, provider: ProviderId) -> AppResult<Arc<ProviderClient>> {
        self.clients
            .get(&provider)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("provider '{provider}' is not supported")))
    }

    /// Returns the configured providers in stable order.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderId> {
        self.clients.keys().copied().collect()
    }

    /// Returns every client as an aggregation source.
    #[must_use]
    pub fn account_sources(&self) -> Vec<Arc<dyn AccountSource>> {
        self.clients
            .values()
            .map(|client| client.clone() as Arc<dyn AccountSource>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use multibank_core::{AppError, ProviderId};

    use crate::consent_service::ConsentPolicy;
    use crate::test_support::{FakeConsentStore, RecordingPublisher, ScriptedTransport, profile};
    use crate::token_cache::TokenCachePolicy;
    use crate::provider_client::ProviderClient;

    use super::ProviderRegistry;

    fn client(provider: ProviderId) -> ProviderClient {
        ProviderClient::new(
            Arc::unwrap_or_clone(profile(provider)),
            Arc::new(ScriptedTransport::default()),
            Arc::new(FakeConsentStore::default()),
            Arc::new(RecordingPublisher::default()),
            TokenCachePolicy::default(),
            ConsentPolicy::default(),
        )
    }

    #[test]
    fn unknown_provider_is_not_found() {
        let registry = ProviderRegistry::new([client(ProviderId::Abank), client(ProviderId::Vbank)]);

        assert_eq!(registry.providers(), vec![ProviderId::Abank, ProviderId::Vbank]);
        assert!(registry.client(ProviderId::Vbank).is_ok());
        assert!(matches!(
            registry.client(ProviderId::Sbank),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(registry.account_sources().len(), 2);
    }
}
