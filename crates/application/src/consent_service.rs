use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use multibank_core::{AppError, AppResult, ClientId, ProviderId};
use multibank_domain::{
    AccountPermission, Consent, ConsentKey, ConsentKind, ConsentScope, ConsentStatus,
    ProductConsentTerms,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::payload;
use crate::provider_ports::{ConsentStore, HttpMethod, ProviderTransport};
use crate::provider_profile::ProviderProfile;
use crate::token_cache::TokenCache;

mod lifecycle;
mod payment;
mod upstream;

/// Tunables of the consent state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentPolicy {
    /// Pause between a `pending` request answer and the single status poll.
    pub poll_delay: Duration,
    /// Permissions requested for account consents.
    pub account_permissions: Vec<AccountPermission>,
    /// Terms requested for product consents.
    pub product_terms: ProductConsentTerms,
    /// Reason sent with account consent requests.
    pub account_reason: String,
    /// Reason sent with product consent requests.
    pub product_reason: String,
}

impl Default for ConsentPolicy {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(5),
            account_permissions: AccountPermission::DEFAULT_SET.to_vec(),
            product_terms: ProductConsentTerms::default(),
            account_reason: String::new(),
            product_reason: "Financial aggregator for product management".to_owned(),
        }
    }
}

/// Stored consent state as observed without calling the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentState {
    /// No record exists.
    Absent,
    /// A request waits on out-of-band end-user approval.
    Pending {
        /// Upstream request id to poll.
        request_id: String,
    },
    /// An approved consent is usable.
    Active {
        /// Upstream consent id.
        consent_id: String,
        /// End of validity.
        expires_at: DateTime<Utc>,
    },
    /// The last record is no longer usable; the next operation requests anew.
    Expired {
        /// End of validity.
        expired_at: DateTime<Utc>,
    },
}

/// Consent manager for one provider.
///
/// Drives account and product consents through absent, pending, approved and
/// expired, persisting every transition in the [`ConsentStore`].
#[derive(Clone)]
pub struct ConsentService {
    profile: Arc<ProviderProfile>,
    transport: Arc<dyn ProviderTransport>,
    tokens: Arc<TokenCache>,
    store: Arc<dyn ConsentStore>,
    policy: ConsentPolicy,
}

impl ConsentService {
    /// Creates a consent manager.
    #[must_use]
    pub fn new(
        profile: Arc<ProviderProfile>,
        transport: Arc<dyn ProviderTransport>,
        tokens: Arc<TokenCache>,
        store: Arc<dyn ConsentStore>,
        policy: ConsentPolicy,
    ) -> Self {
        Self {
            profile,
            transport,
            tokens,
            store,
            policy,
        }
    }

    /// Returns the provider this manager negotiates with.
    #[must_use]
    pub fn provider(&self) -> ProviderId {
        self.profile.provider
    }

    /// Returns the configured policy.
    #[must_use]
    pub fn policy(&self) -> &ConsentPolicy {
        &self.policy
    }

    fn scope_for(&self, kind: ConsentKind) -> ConsentScope {
        match kind {
            ConsentKind::Account => ConsentScope::Account {
                permissions: self.policy.account_permissions.clone(),
            },
            ConsentKind::Product => ConsentScope::Product(self.policy.product_terms.clone()),
        }
    }

    fn unavailable(&self, message: impl Into<String>, pending_request_id: Option<String>) -> AppError {
        AppError::ConsentUnavailable {
            provider: self.provider(),
            message: message.into(),
            pending_request_id,
        }
    }
}
