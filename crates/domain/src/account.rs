use chrono::{DateTime, Utc};
use multibank_core::ProviderId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identification scheme carrying the account number used for payments.
pub const PAN_SCHEME: &str = "RU.CBR.PAN";

/// Account status reported by providers for usable accounts.
pub const ENABLED_ACCOUNT_STATUS: &str = "Enabled";

/// Monetary amount with an optional ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Decimal value.
    pub value: Decimal,
    /// Currency code, when the provider reported one.
    pub currency: Option<String>,
}

impl Amount {
    /// Creates an amount.
    #[must_use]
    pub fn new(value: Decimal, currency: Option<String>) -> Self {
        Self { value, currency }
    }
}

/// One scheme-qualified identification of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentification {
    /// Scheme name, e.g. [`PAN_SCHEME`].
    pub scheme_name: String,
    /// Identifier within the scheme.
    pub identification: String,
    /// Optional holder name.
    pub name: Option<String>,
}

impl AccountIdentification {
    /// Builds a PAN identification for a plain account number.
    #[must_use]
    pub fn pan(account_number: impl Into<String>) -> Self {
        Self {
            scheme_name: PAN_SCHEME.to_owned(),
            identification: account_number.into(),
            name: None,
        }
    }
}

/// Kind of balance reported for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceType {
    /// Funds available for spending.
    InterimAvailable,
    /// Booked ledger balance.
    InterimBooked,
    /// Any other provider-specific balance type.
    Other(String),
}

impl BalanceType {
    /// Parses the provider balance type flag.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "InterimAvailable" => Self::InterimAvailable,
            "InterimBooked" => Self::InterimBooked,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Balance record for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Owning account identifier.
    pub account_id: Option<String>,
    /// Balance type flag.
    pub balance_type: BalanceType,
    /// Time the balance was computed upstream.
    pub date_time: Option<DateTime<Utc>>,
    /// Balance amount.
    pub amount: Option<Amount>,
    /// Credit or debit indicator.
    pub credit_debit_indicator: Option<String>,
}

/// Normalized transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Provider transaction identifier.
    pub transaction_id: String,
    /// Owning account identifier.
    pub account_id: String,
    /// Provider the transaction was read from.
    pub provider: ProviderId,
    /// Transaction amount.
    pub amount: Option<Amount>,
    /// Credit or debit indicator.
    pub credit_debit_indicator: Option<String>,
    /// Booking status.
    pub status: Option<String>,
    /// Booking time.
    pub booking_date_time: Option<DateTime<Utc>>,
    /// Value time.
    pub value_date_time: Option<DateTime<Utc>>,
    /// Free-form description.
    pub information: Option<String>,
    /// Provider transaction code.
    pub bank_transaction_code: Option<String>,
}

impl Transaction {
    /// Builds the booked debit transaction representing an executed payment.
    #[must_use]
    pub fn booked_payment(
        provider: ProviderId,
        payment_id: impl Into<String>,
        debtor_account: impl Into<String>,
        amount: Amount,
        booked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: payment_id.into(),
            account_id: debtor_account.into(),
            provider,
            amount: Some(amount),
            credit_debit_indicator: Some("Debit".to_owned()),
            status: Some("Booked".to_owned()),
            booking_date_time: Some(booked_at),
            value_date_time: Some(booked_at),
            information: Some("Payment".to_owned()),
            bank_transaction_code: None,
        }
    }
}

/// Normalized, provider-tagged account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Provider account identifier.
    pub account_id: String,
    /// Provider the account lives at.
    pub provider: ProviderId,
    /// Provider-reported status.
    pub status: String,
    /// Account currency.
    pub currency: Option<String>,
    /// Account type.
    pub account_type: Option<String>,
    /// Account sub type.
    pub account_sub_type: Option<String>,
    /// Customer-facing nickname.
    pub nickname: Option<String>,
    /// Opening date as reported upstream.
    pub opening_date: Option<String>,
    /// Scheme-qualified identifications.
    pub identifications: Vec<AccountIdentification>,
    /// Booked balance, from the `InterimBooked` balance record.
    pub current_balance: Option<Decimal>,
    /// Available balance, from the `InterimAvailable` balance record.
    pub available_balance: Option<Decimal>,
    /// Time of the booked balance.
    pub last_updated: Option<DateTime<Utc>>,
    /// Transactions attached during account fetch.
    pub transactions: Vec<Transaction>,
}

impl Account {
    /// Creates an account with no balances, identifications or transactions.
    #[must_use]
    pub fn new(provider: ProviderId, account_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            provider,
            status: status.into(),
            currency: None,
            account_type: None,
            account_sub_type: None,
            nickname: None,
            opening_date: None,
            identifications: Vec::new(),
            current_balance: None,
            available_balance: None,
            last_updated: None,
            transactions: Vec::new(),
        }
    }

    /// Returns true when the provider reports the account as usable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(ENABLED_ACCOUNT_STATUS)
    }

    /// Returns the PAN account number, falling back to the account id.
    #[must_use]
    pub fn account_number(&self) -> &str {
        self.identifications
            .iter()
            .find(|identification| identification.scheme_name == PAN_SCHEME)
            .map_or(self.account_id.as_str(), |identification| {
                identification.identification.as_str()
            })
    }

    /// Returns the current balance, treating an absent balance as zero.
    #[must_use]
    pub fn current_balance_or_zero(&self) -> Decimal {
        self.current_balance.unwrap_or(Decimal::ZERO)
    }

    /// Returns the available balance, falling back to the current balance.
    #[must_use]
    pub fn available_balance_or_current(&self) -> Decimal {
        self.available_balance
            .unwrap_or_else(|| self.current_balance_or_zero())
    }

    /// Copies balance records onto the account by balance type.
    pub fn apply_balances(&mut self, balances: &[Balance]) {
        for balance in balances {
            let Some(amount) = balance.amount.as_ref() else {
                continue;
            };

            match balance.balance_type {
                BalanceType::InterimAvailable => self.available_balance = Some(amount.value),
                BalanceType::InterimBooked => {
                    self.current_balance = Some(amount.value);
                    self.last_updated = balance.date_time;
                }
                BalanceType::Other(_) => {}
            }
        }
    }
}

/// Request to open an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Account type, e.g. `checking` or `savings`.
    pub account_type: String,
    /// Initial deposit.
    pub initial_balance: Decimal,
}

/// Request to close an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountClosure {
    /// Account to close.
    pub account_id: String,
    /// What to do with the remaining funds, e.g. `transfer`.
    pub action: String,
    /// Account receiving the remaining funds.
    pub destination_account_id: Option<String>,
}
