//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod account;
mod aggregation;
mod card;
mod consent;
mod event;
mod payment;
mod product;

pub use account::{
    Account, AccountClosure, AccountIdentification, Amount, Balance, BalanceType,
    ENABLED_ACCOUNT_STATUS, NewAccount, PAN_SCHEME, Transaction,
};
pub use aggregation::{
    AggregationBuilder, AggregationResult, ProviderOutcome, UNKNOWN_CURRENCY,
};
pub use card::{Card, CardLimits, NewCard};
pub use consent::{
    ACCOUNT_CONSENT_VALIDITY_DAYS, AccountPermission, Consent, ConsentInput, ConsentKey,
    ConsentKind, ConsentScope, ConsentStatus, PRODUCT_CONSENT_VALIDITY_DAYS, ProductConsentTerms,
};
pub use event::DomainEvent;
pub use payment::{DEFAULT_PAYMENT_CURRENCY, PaymentOrder};
pub use product::{Product, ProductClosure, ProductPurchase};
