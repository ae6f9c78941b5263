//! Application services and ports.

#![forbid(unsafe_code)]

mod aggregation_service;
mod consent_service;
mod payload;
mod provider_client;
mod provider_ports;
mod provider_profile;
mod provider_registry;
mod token_cache;

#[cfg(test)]
mod test_support;

pub use aggregation_service::{AggregationPolicy, AggregationService, DEFAULT_PROVIDER_TIMEOUT};
pub use consent_service::{ConsentPolicy, ConsentService, ConsentState};
pub use provider_client::{
    DEFAULT_CARD_VALIDITY_DAYS, OpenBankingNormalizer, PayloadNormalizer, ProviderClient,
    UNKNOWN_FIELD_VALUE,
};
pub use provider_ports::{
    AccountSource, ConsentStore, DomainEventPublisher, HttpMethod, ProviderTransport,
    UpstreamRequest, UpstreamResponse,
};
pub use provider_profile::{DEFAULT_REQUESTING_BANK_NAME, ProviderCredentials, ProviderProfile};
pub use provider_registry::ProviderRegistry;
pub use token_cache::{TokenCache, TokenCachePolicy};
