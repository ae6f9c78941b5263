use multibank_core::{ClientId, ProviderId};
use serde::{Deserialize, Serialize};

use crate::{Account, AccountClosure, Product, Transaction};

/// State change published to downstream consumers after a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A new account was opened.
    AccountOpened {
        /// Owning client.
        client_id: ClientId,
        /// Normalized account as returned by the provider.
        account: Account,
    },
    /// An account was closed.
    AccountClosed {
        /// Owning client.
        client_id: ClientId,
        /// Provider the account lived at.
        provider: ProviderId,
        /// Closure instruction that was executed.
        closure: AccountClosure,
    },
    /// A product agreement was opened.
    ProductPurchased {
        /// Owning client.
        client_id: ClientId,
        /// Normalized agreement.
        product: Product,
    },
    /// A transaction was booked by this system, e.g. an executed payment.
    TransactionPosted {
        /// Owning client.
        client_id: ClientId,
        /// Normalized transaction.
        transaction: Transaction,
    },
}

impl DomainEvent {
    /// Returns stable event type value.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AccountOpened { .. } => "account_opened",
            Self::AccountClosed { .. } => "account_closed",
            Self::ProductPurchased { .. } => "product_purchased",
            Self::TransactionPosted { .. } => "transaction_posted",
        }
    }

    /// Returns the owning client.
    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        match self {
            Self::AccountOpened { client_id, .. }
            | Self::AccountClosed { client_id, .. }
            | Self::ProductPurchased { client_id, .. }
            | Self::TransactionPosted { client_id, .. } => client_id,
        }
    }

    /// Returns the provider the event originated at.
    #[must_use]
    pub fn provider(&self) -> ProviderId {
        match self {
            Self::AccountOpened { account, .. } => account.provider,
            Self::AccountClosed { provider, .. } => *provider,
            Self::ProductPurchased { product, .. } => product.provider,
            Self::TransactionPosted { transaction, .. } => transaction.provider,
        }
    }
}
