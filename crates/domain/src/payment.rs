use multibank_core::ProviderId;
use rust_decimal::Decimal;

/// Currency used for payment initiation when none is given.
pub const DEFAULT_PAYMENT_CURRENCY: &str = "RUB";

/// Payment order between two PAN-identified accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrder {
    /// Account number being debited at the executing provider.
    pub debtor_account: String,
    /// Account number being credited.
    pub creditor_account: String,
    /// Provider holding the creditor account.
    pub creditor_provider: ProviderId,
    /// Instructed amount.
    pub amount: Decimal,
    /// Instructed currency.
    pub currency: String,
}

impl PaymentOrder {
    /// Creates an order in the default payment currency.
    #[must_use]
    pub fn new(
        debtor_account: impl Into<String>,
        creditor_account: impl Into<String>,
        creditor_provider: ProviderId,
        amount: Decimal,
    ) -> Self {
        Self {
            debtor_account: debtor_account.into(),
            creditor_account: creditor_account.into(),
            creditor_provider,
            amount,
            currency: DEFAULT_PAYMENT_CURRENCY.to_owned(),
        }
    }
}
