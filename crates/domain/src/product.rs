use multibank_core::ProviderId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Financial product, either a catalog entry or a client agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog product identifier.
    pub product_id: String,
    /// Product type, e.g. `deposit` or `loan`.
    pub product_type: Option<String>,
    /// Product name.
    pub product_name: Option<String>,
    /// Marketing description.
    pub description: Option<String>,
    /// Interest rate as reported upstream.
    pub interest_rate: Option<String>,
    /// Minimum amount.
    pub min_amount: Option<Decimal>,
    /// Maximum amount.
    pub max_amount: Option<Decimal>,
    /// Term length in months.
    pub term_months: Option<u32>,
    /// Agreement identifier, set for products the client holds.
    pub agreement_id: Option<String>,
    /// Agreement status.
    pub status: Option<String>,
    /// Provider offering the product.
    pub provider: ProviderId,
}

/// Request to open a product agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPurchase {
    /// Catalog product identifier.
    pub product_id: String,
    /// Product type, checked against the product consent when known.
    pub product_type: Option<String>,
    /// Amount placed into the product.
    pub amount: Decimal,
    /// Account funding the purchase.
    pub source_account_id: String,
}

/// Request to close a product agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductClosure {
    /// Agreement identifier.
    pub agreement_id: String,
    /// Account receiving or paying the settlement.
    pub repayment_account_id: String,
    /// Settlement amount.
    pub repayment_amount: Decimal,
}
