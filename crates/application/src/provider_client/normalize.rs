use chrono::{DateTime, Duration, Utc};
use multibank_core::{AppError, AppResult, ProviderId};
use multibank_domain::{
    Account, AccountIdentification, Amount, Balance, BalanceType, Card, CardLimits, Product,
    Transaction,
};
use serde_json::Value;

use crate::payload::{
    array_field, datetime_field, decimal_field, object_field, string_field, u32_field,
};

/// Status and naming used when a provider omits a card field.
pub const UNKNOWN_FIELD_VALUE: &str = "unknown";

/// Validity assumed for a card whose expiry date is missing or malformed.
pub const DEFAULT_CARD_VALIDITY_DAYS: i64 = 365;

/// Strategy mapping one provider's JSON records into the normalized model.
///
/// Implementations substitute defaults for absent or malformed fields and only
/// return [`AppError::Mapping`] when a record cannot be built at all.
pub trait PayloadNormalizer: Send + Sync {
    /// Maps one account record.
    fn account(&self, provider: ProviderId, value: &Value) -> AppResult<Account>;

    /// Maps one balance record.
    fn balance(&self, provider: ProviderId, value: &Value) -> AppResult<Balance>;

    /// Maps one transaction record of the given account.
    fn transaction(
        &self,
        provider: ProviderId,
        account_id: &str,
        value: &Value,
    ) -> AppResult<Transaction>;

    /// Maps one card record.
    fn card(&self, provider: ProviderId, value: &Value, now: DateTime<Utc>) -> AppResult<Card>;

    /// Maps one product or agreement record.
    fn product(&self, provider: ProviderId, value: &Value) -> AppResult<Product>;
}

/// Normalizer for the Open Banking flavoured payloads served by the supported
/// providers. Accepts both camelCase and snake_case field names.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenBankingNormalizer;

fn require_object(provider: ProviderId, value: &Value, record: &str) -> AppResult<()> {
    if value.is_object() {
        return Ok(());
    }

    Err(AppError::Mapping {
        provider,
        message: format!("{record} record is not a JSON object"),
    })
}

fn require_id(provider: ProviderId, value: &Value, record: &str, keys: &[&str]) -> AppResult<String> {
    string_field(value, keys).ok_or_else(|| AppError::Mapping {
        provider,
        message: format!("{record} record has no identifier"),
    })
}

fn amount(value: &Value) -> Option<Amount> {
    let amount = object_field(value, &["amount", "instructedAmount"])?;
    let decimal = decimal_field(amount, &["amount", "value"])?;
    Some(Amount::new(decimal, string_field(amount, &["currency"])))
}

impl PayloadNormalizer for OpenBankingNormalizer {
    fn account(&self, provider: ProviderId, value: &Value) -> AppResult<Account> {
        require_object(provider, value, "account")?;
        let account_id = require_id(provider, value, "account", &["accountId", "account_id", "id"])?;
        let status = string_field(value, &["status"]).unwrap_or_else(|| UNKNOWN_FIELD_VALUE.to_owned());

        let mut account = Account::new(provider, account_id, status);
        account.currency = string_field(value, &["currency"]);
        account.account_type = string_field(value, &["accountType", "account_type"]);
        account.account_sub_type = string_field(value, &["accountSubType", "account_sub_type"]);
        account.nickname = string_field(value, &["nickname"]);
        account.opening_date = string_field(value, &["openingDate", "opening_date"]);

        // A flat account number wins over any identification list.
        account.identifications = match string_field(value, &["account_number", "accountNumber"]) {
            Some(account_number) => vec![AccountIdentification::pan(account_number)],
            None => array_field(value, &["account"])
                .into_iter()
                .filter_map(|identification| {
                    Some(AccountIdentification {
                        scheme_name: string_field(identification, &["schemeName", "scheme_name"])?,
                        identification: string_field(identification, &["identification"])?,
                        name: string_field(identification, &["name"]),
                    })
                })
                .collect(),
        };

        Ok(account)
    }

    fn balance(&self, provider: ProviderId, value: &Value) -> AppResult<Balance> {
        require_object(provider, value, "balance")?;

        Ok(Balance {
            account_id: string_field(value, &["accountId", "account_id"]),
            balance_type: string_field(value, &["type", "balanceType"])
                .map_or_else(|| BalanceType::Other(String::new()), |raw| BalanceType::parse(&raw)),
            date_time: datetime_field(value, &["dateTime", "date_time"]),
            amount: amount(value),
            credit_debit_indicator: string_field(
                value,
                &["creditDebitIndicator", "credit_debit_indicator"],
            ),
        })
    }

    fn transaction(
        &self,
        provider: ProviderId,
        account_id: &str,
        value: &Value,
    ) -> AppResult<Transaction> {
        require_object(provider, value, "transaction")?;
        let transaction_id = require_id(
            provider,
            value,
            "transaction",
            &["transactionId", "transaction_id", "id"],
        )?;

        Ok(Transaction {
            transaction_id,
            account_id: string_field(value, &["accountId", "account_id"])
                .unwrap_or_else(|| account_id.to_owned()),
            provider,
            amount: amount(value),
            credit_debit_indicator: string_field(
                value,
                &["creditDebitIndicator", "credit_debit_indicator"],
            ),
            status: string_field(value, &["status"]),
            booking_date_time: datetime_field(value, &["bookingDateTime", "booking_date_time"]),
            value_date_time: datetime_field(value, &["valueDateTime", "value_date_time"]),
            information: string_field(
                value,
                &["transactionInformation", "transaction_information", "description"],
            ),
            bank_transaction_code: object_field(value, &["bankTransactionCode"])
                .and_then(|code| string_field(code, &["code"]))
                .or_else(|| string_field(value, &["bankTransactionCode", "bank_transaction_code"])),
        })
    }

    fn card(&self, provider: ProviderId, value: &Value, now: DateTime<Utc>) -> AppResult<Card> {
        require_object(provider, value, "card")?;
        let card_id = require_id(provider, value, "card", &["card_id", "cardId", "id"])?;
        let text = |keys: &[&str]| {
            string_field(value, keys).unwrap_or_else(|| UNKNOWN_FIELD_VALUE.to_owned())
        };

        let limits = object_field(value, &["limits"]).map(|limits| CardLimits {
            daily_limit: decimal_field(limits, &["daily_limit", "dailyLimit"]),
            monthly_limit: decimal_field(limits, &["monthly_limit", "monthlyLimit"]),
            single_transaction_limit: decimal_field(
                limits,
                &["single_transaction_limit", "singleTransactionLimit"],
            ),
            currency: string_field(limits, &["currency"]),
        });

        Ok(Card {
            card_id,
            card_number: text(&["card_number", "cardNumber"]),
            card_name: text(&["card_name", "cardName"]),
            card_type: text(&["card_type", "cardType"]),
            status: text(&["status"]),
            account_number: text(&["account_number", "accountNumber"]),
            provider,
            issue_date: datetime_field(value, &["issue_date", "issueDate"]).unwrap_or(now),
            expiry_date: datetime_field(value, &["expiry_date", "expiryDate"])
                .unwrap_or_else(|| now + Duration::days(DEFAULT_CARD_VALIDITY_DAYS)),
            limits,
        })
    }

    fn product(&self, provider: ProviderId, value: &Value) -> AppResult<Product> {
        require_object(provider, value, "product")?;
        let product_id = require_id(provider, value, "product", &["productId", "product_id"])?;
        let single_amount = decimal_field(value, &["amount"]);

        Ok(Product {
            product_id,
            product_type: string_field(value, &["productType", "product_type"]),
            product_name: string_field(value, &["productName", "product_name"]),
            description: string_field(value, &["description"]),
            interest_rate: string_field(value, &["interestRate", "interest_rate"]),
            min_amount: decimal_field(value, &["minAmount", "min_amount"]).or(single_amount),
            max_amount: decimal_field(value, &["maxAmount", "max_amount"]).or(single_amount),
            term_months: u32_field(value, &["termMonths", "term_months"]),
            agreement_id: string_field(value, &["agreement_id", "agreementId"]),
            status: string_field(value, &["status"]),
            provider,
        })
    }
}
