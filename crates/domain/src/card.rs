use chrono::{DateTime, Utc};
use multibank_core::ProviderId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spending limits attached to a card. Each limit is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLimits {
    /// Daily spending limit.
    pub daily_limit: Option<Decimal>,
    /// Monthly spending limit.
    pub monthly_limit: Option<Decimal>,
    /// Per-transaction limit.
    pub single_transaction_limit: Option<Decimal>,
    /// Limit currency.
    pub currency: Option<String>,
}

/// Normalized payment card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Provider card identifier.
    pub card_id: String,
    /// Masked card number.
    pub card_number: String,
    /// Card display name.
    pub card_name: String,
    /// Card product type.
    pub card_type: String,
    /// Card status, `unknown` when the provider omitted it.
    pub status: String,
    /// Linked account number.
    pub account_number: String,
    /// Provider that issued the card.
    pub provider: ProviderId,
    /// Issue date.
    pub issue_date: DateTime<Utc>,
    /// Expiry date.
    pub expiry_date: DateTime<Utc>,
    /// Spending limits, when reported.
    pub limits: Option<CardLimits>,
}

/// Request to issue a card on an existing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    /// Account number the card is linked to.
    pub account_number: String,
    /// Card product type.
    pub card_type: String,
    /// Card display name.
    pub card_name: String,
}
