//! Multibank aggregation runner.

#![forbid(unsafe_code)]

mod config;
mod database;

use std::sync::Arc;

use multibank_application::{
    AggregationPolicy, AggregationService, ConsentPolicy, ConsentStore, DomainEventPublisher,
    ProviderClient, ProviderCredentials, ProviderProfile, ProviderRegistry, TokenCachePolicy,
};
use multibank_core::{AppError, AppResult};
use multibank_infrastructure::{
    HttpProviderTransport, InMemoryConsentStore, PostgresConsentStore, TracingEventConsumer,
    event_channel,
};
use tracing::{info, warn};

use crate::config::{AggregatorConfig, init_tracing};
use crate::database::connect_and_migrate;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AggregatorConfig::load()?;

    let consent_store: Arc<dyn ConsentStore> = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = connect_and_migrate(database_url).await?;
            info!("using postgres consent store");
            Arc::new(PostgresConsentStore::new(pool))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory consent store");
            Arc::new(InMemoryConsentStore::new())
        }
    };

    let (publisher, receiver) = event_channel(config.event_channel_capacity);
    let drain = receiver.spawn_drain(Arc::new(TracingEventConsumer));

    let registry = build_registry(&config, consent_store, Arc::new(publisher))?;
    let aggregation = AggregationService::from_registry(
        &registry,
        AggregationPolicy {
            provider_timeout: config.aggregation_timeout,
        },
    );

    info!(
        client_id = %config.client_id,
        providers = ?registry.providers(),
        timeout_ms = config.aggregation_timeout.as_millis(),
        "multibank-aggregator started"
    );

    let result = aggregation
        .aggregate(
            config.client_id.as_str(),
            Some(config.provider_filter.as_slice()),
        )
        .await;

    let rendered = serde_json::to_string_pretty(&result).map_err(|error| {
        AppError::Internal(format!("failed to render aggregation result: {error}"))
    })?;
    println!("{rendered}");

    // Dropping every client closes the event channel so the drain can finish.
    drop(aggregation);
    drop(registry);
    match drain.await {
        Ok(consumed) => info!(consumed, "event drain finished"),
        Err(error) => warn!(error = %error, "event drain task failed"),
    }

    if result.success {
        Ok(())
    } else {
        Err(AppError::Internal(format!(
            "aggregation for client '{}' failed",
            config.client_id
        )))
    }
}

fn build_registry(
    config: &AggregatorConfig,
    consent_store: Arc<dyn ConsentStore>,
    events: Arc<dyn DomainEventPublisher>,
) -> AppResult<ProviderRegistry> {
    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let token_policy = TokenCachePolicy {
        safety_margin: config.token_safety_margin,
        ..TokenCachePolicy::default()
    };
    let consent_policy = ConsentPolicy {
        poll_delay: config.consent_poll_delay,
        ..ConsentPolicy::default()
    };

    let clients = config.providers.iter().map(|endpoint| {
        let mut profile = ProviderProfile::new(
            endpoint.provider,
            ProviderCredentials::new(endpoint.client_id.as_str(), endpoint.client_secret.as_str()),
        )
        .with_requesting_bank_name(config.requesting_bank_name.as_str());
        for (name, value) in &endpoint.extra_headers {
            profile = profile.with_extra_header(name.as_str(), value.as_str());
        }

        let transport = Arc::new(HttpProviderTransport::new(
            http_client.clone(),
            endpoint.provider,
            endpoint.base_url.clone(),
            config.http_timeout,
        ));

        ProviderClient::new(
            profile,
            transport,
            consent_store.clone(),
            events.clone(),
            token_policy,
            consent_policy.clone(),
        )
    });

    Ok(ProviderRegistry::new(clients))
}
