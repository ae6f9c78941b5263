use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use multibank_core::ProviderId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Account;

/// Currency bucket used for accounts that did not report a currency.
pub const UNKNOWN_CURRENCY: &str = "unknown";

/// How one provider's fetch ended within an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProviderOutcome {
    /// Accounts were fetched.
    Succeeded {
        /// Number of accounts returned, active or not.
        accounts: usize,
    },
    /// The fetch exceeded its time budget; its result was discarded.
    TimedOut,
    /// The fetch failed.
    Failed {
        /// Failure detail.
        message: String,
    },
}

/// Point-in-time snapshot of a client's accounts across providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// False only when the aggregation call itself failed before dispatch.
    pub success: bool,
    /// Requested client.
    pub client_id: String,
    /// Sum of current balances over active accounts.
    pub total_balance: Decimal,
    /// Sum of available balances over active accounts.
    pub total_available_balance: Decimal,
    /// Number of accounts regardless of status.
    pub total_accounts: usize,
    /// Number of active accounts.
    pub active_accounts: usize,
    /// Active current balance per queried provider; zero for failed providers.
    pub balance_by_provider: BTreeMap<ProviderId, Decimal>,
    /// Active current balance per currency.
    pub balance_by_currency: BTreeMap<String, Decimal>,
    /// Fetch outcome per queried provider.
    pub provider_outcomes: BTreeMap<ProviderId, ProviderOutcome>,
    /// Every fetched account.
    pub accounts: Vec<Account>,
    /// Snapshot time.
    pub timestamp: DateTime<Utc>,
}

impl AggregationResult {
    /// Builds the zero-valued result returned when the aggregation call fails.
    #[must_use]
    pub fn failed(client_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            client_id: client_id.into(),
            total_balance: Decimal::ZERO,
            total_available_balance: Decimal::ZERO,
            total_accounts: 0,
            active_accounts: 0,
            balance_by_provider: BTreeMap::new(),
            balance_by_currency: BTreeMap::new(),
            provider_outcomes: BTreeMap::new(),
            accounts: Vec::new(),
            timestamp,
        }
    }
}

/// Accumulates per-provider results and folds them into an [`AggregationResult`].
///
/// Results are keyed by provider identity, so the order in which providers are
/// recorded does not affect the snapshot totals.
#[derive(Debug, Clone)]
pub struct AggregationBuilder {
    client_id: String,
    accounts: BTreeMap<ProviderId, Vec<Account>>,
    balance_by_provider: BTreeMap<ProviderId, Decimal>,
    provider_outcomes: BTreeMap<ProviderId, ProviderOutcome>,
}

impl AggregationBuilder {
    /// Starts an aggregation for one client.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            accounts: BTreeMap::new(),
            balance_by_provider: BTreeMap::new(),
            provider_outcomes: BTreeMap::new(),
        }
    }

    /// Records a successful provider fetch.
    pub fn record_accounts(&mut self, provider: ProviderId, accounts: Vec<Account>) {
        let provider_total = accounts
            .iter()
            .filter(|account| account.is_active())
            .map(Account::current_balance_or_zero)
            .sum();

        self.balance_by_provider.insert(provider, provider_total);
        self.provider_outcomes.insert(
            provider,
            ProviderOutcome::Succeeded {
                accounts: accounts.len(),
            },
        );
        self.accounts.insert(provider, accounts);
    }

    /// Records a provider whose fetch timed out.
    pub fn record_timeout(&mut self, provider: ProviderId) {
        self.record_zero(provider, ProviderOutcome::TimedOut);
    }

    /// Records a provider whose fetch failed.
    pub fn record_failure(&mut self, provider: ProviderId, message: impl Into<String>) {
        self.record_zero(
            provider,
            ProviderOutcome::Failed {
                message: message.into(),
            },
        );
    }

    /// Returns true when the provider already has an outcome.
    #[must_use]
    pub fn has_outcome(&self, provider: ProviderId) -> bool {
        self.provider_outcomes.contains_key(&provider)
    }

    fn record_zero(&mut self, provider: ProviderId, outcome: ProviderOutcome) {
        self.accounts.remove(&provider);
        self.balance_by_provider.insert(provider, Decimal::ZERO);
        self.provider_outcomes.insert(provider, outcome);
    }

    /// Walks the unified account list once and produces the snapshot.
    #[must_use]
    pub fn finish(self, timestamp: DateTime<Utc>) -> AggregationResult {
        let accounts: Vec<Account> = self.accounts.into_values().flatten().collect();

        let mut total_balance = Decimal::ZERO;
        let mut total_available_balance = Decimal::ZERO;
        let mut active_accounts = 0_usize;
        let mut balance_by_currency: BTreeMap<String, Decimal> = BTreeMap::new();

        for account in accounts.iter().filter(|account| account.is_active()) {
            let balance = account.current_balance_or_zero();
            active_accounts += 1;
            total_balance += balance;
            total_available_balance += account.available_balance_or_current();

            let currency = account
                .currency
                .clone()
                .unwrap_or_else(|| UNKNOWN_CURRENCY.to_owned());
            *balance_by_currency.entry(currency).or_insert(Decimal::ZERO) += balance;
        }

        AggregationResult {
            success: true,
            client_id: self.client_id,
            total_balance,
            total_available_balance,
            total_accounts: accounts.len(),
            active_accounts,
            balance_by_provider: self.balance_by_provider,
            balance_by_currency,
            provider_outcomes: self.provider_outcomes,
            accounts,
            timestamp,
        }
    }
}
