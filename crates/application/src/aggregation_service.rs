use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use multibank_core::{AppError, AppResult, ClientId, ProviderId};
use multibank_domain::{Account, AggregationBuilder, AggregationResult};
use tokio::task::JoinSet;
use tokio::time::error::Elapsed;
use tracing::{error, info, warn};

use crate::provider_ports::AccountSource;
use crate::provider_registry::ProviderRegistry;

/// Time budget of one provider fetch inside an aggregation.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables of the aggregation fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationPolicy {
    /// Hard per-provider timeout; a provider exceeding it reports zero.
    pub provider_timeout: Duration,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

type FetchOutcome = (ProviderId, Result<AppResult<Vec<Account>>, Elapsed>);

/// Aggregation engine: fans out to account sources concurrently and folds
/// their answers into one snapshot.
#[derive(Clone)]
pub struct AggregationService {
    sources: BTreeMap<ProviderId, Arc<dyn AccountSource>>,
    policy: AggregationPolicy,
}

impl AggregationService {
    /// Creates an aggregation engine over the given sources.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn AccountSource>>, policy: AggregationPolicy) -> Self {
        Self {
            sources: sources
                .into_iter()
                .map(|source| (source.provider(), source))
                .collect(),
            policy,
        }
    }

    /// Creates an aggregation engine over every registered provider.
    #[must_use]
    pub fn from_registry(registry: &ProviderRegistry, policy: AggregationPolicy) -> Self {
        Self::new(registry.account_sources(), policy)
    }

    /// Returns the providers this engine can query.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderId> {
        self.sources.keys().copied().collect()
    }

    /// Aggregates the client's accounts across the selected providers.
    ///
    /// `None` or an empty filter queries every provider. Provider failures and
    /// timeouts are absorbed as zero buckets; only a failure before dispatch
    /// yields a zero-valued result with `success == false`.
    pub async fn aggregate(
        &self,
        client_id: &str,
        provider_filter: Option<&[ProviderId]>,
    ) -> AggregationResult {
        let started_at = Utc::now();

        match self.run(client_id, provider_filter).await {
            Ok(result) => result,
            Err(error) => {
                error!(client_id = %client_id, error = %error, "aggregation failed");
                AggregationResult::failed(client_id, started_at)
            }
        }
    }

    async fn run(
        &self,
        client_id: &str,
        provider_filter: Option<&[ProviderId]>,
    ) -> AppResult<AggregationResult> {
        let client_id = ClientId::new(client_id)?;
        let selected = self.select(provider_filter)?;
        let timeout = self.policy.provider_timeout;

        info!(
            client_id = %client_id,
            providers = selected.len(),
            timeout_ms = timeout.as_millis(),
            "starting aggregation"
        );

        let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();
        for source in &selected {
            let source = source.clone();
            let client_id = client_id.clone();
            tasks.spawn(async move {
                let provider = source.provider();
                let outcome = tokio::time::timeout(timeout, source.fetch_accounts(&client_id)).await;
                (provider, outcome)
            });
        }

        let mut builder = AggregationBuilder::new(client_id.as_str());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((provider, Ok(Ok(accounts)))) => {
                    info!(
                        provider = %provider,
                        client_id = %client_id,
                        accounts = accounts.len(),
                        "provider fetch succeeded"
                    );
                    builder.record_accounts(provider, accounts);
                }
                Ok((provider, Ok(Err(error)))) => {
                    warn!(
                        provider = %provider,
                        client_id = %client_id,
                        error = %error,
                        "provider fetch failed, reporting zero balance"
                    );
                    builder.record_failure(provider, error.to_string());
                }
                Ok((provider, Err(_))) => {
                    warn!(
                        provider = %provider,
                        client_id = %client_id,
                        timeout_ms = timeout.as_millis(),
                        "provider fetch timed out, reporting zero balance"
                    );
                    builder.record_timeout(provider);
                }
                Err(join_error) => {
                    warn!(client_id = %client_id, error = %join_error, "provider fetch task aborted");
                }
            }
        }

        for source in &selected {
            let provider = source.provider();
            if !builder.has_outcome(provider) {
                builder.record_failure(provider, "provider fetch task did not complete");
            }
        }

        let result = builder.finish(Utc::now());
        info!(
            client_id = %client_id,
            total_balance = %result.total_balance,
            total_accounts = result.total_accounts,
            active_accounts = result.active_accounts,
            "aggregation finished"
        );

        Ok(result)
    }

    fn select(&self, provider_filter: Option<&[ProviderId]>) -> AppResult<Vec<Arc<dyn AccountSource>>> {
        let selected: Vec<Arc<dyn AccountSource>> = match provider_filter {
            Some(filter) if !filter.is_empty() => {
                for provider in filter {
                    if !self.sources.contains_key(provider) {
                        warn!(provider = %provider, "requested provider is not configured");
                    }
                }

                self.sources
                    .iter()
                    .filter(|(provider, _)| filter.contains(provider))
                    .map(|(_, source)| source.clone())
                    .collect()
            }
            _ => self.sources.values().cloned().collect(),
        };

        if selected.is_empty() {
            return Err(AppError::Validation(
                "no configured provider matches the aggregation request".to_owned(),
            ));
        }

        Ok(selected)
    }
}
