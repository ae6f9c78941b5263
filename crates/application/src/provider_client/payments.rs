use rust_decimal::Decimal;

use super::*;

impl ProviderClient {
    /// Executes a payment from one of the client's accounts at this provider.
    ///
    /// Obtains a single-use payment consent first, then publishes
    /// [`DomainEvent::TransactionPosted`] with the booked debit. Returns the
    /// provider payment id.
    pub async fn create_payment(&self, client_id: &ClientId, order: &PaymentOrder) -> AppResult<String> {
        if order.amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "payment amount must be positive".to_owned(),
            ));
        }

        let payment_consent = self
            .consents
            .request_payment_consent(client_id, &order.debtor_account, order.amount)
            .await?;

        let request = self
            .authorized(HttpMethod::Post, "/payments")
            .await?
            .with_query("client_id", client_id.as_str())
            .with_header("client_id", client_id.as_str())
            .with_header("x-requesting-bank", self.profile.requesting_bank())
            .with_header("x-payment-consent-id", payment_consent)
            .with_json(json!({
                "data": {
                    "initiation": {
                        "instructedAmount": {
                            "amount": payload::decimal_to_json(order.amount),
                            "currency": order.currency,
                        },
                        "debtorAccount": {
                            "schemeName": PAN_SCHEME,
                            "identification": order.debtor_account,
                        },
                        "creditorAccount": {
                            "schemeName": PAN_SCHEME,
                            "identification": order.creditor_account,
                            "bank_code": order.creditor_provider.as_str(),
                        },
                    }
                }
            }));

        let body = self.send(request).await?;
        let payment_id = payload::data(&body)
            .and_then(|data| payload::string_field(data, &["paymentId", "payment_id"]))
            .ok_or_else(|| self.missing_data("payment"))?;

        info!(
            provider = %self.provider(),
            client_id = %client_id,
            payment_id = %payment_id,
            creditor_provider = %order.creditor_provider,
            "payment executed"
        );
        self.publish(DomainEvent::TransactionPosted {
            client_id: client_id.clone(),
            transaction: Transaction::booked_payment(
                self.provider(),
                payment_id.clone(),
                order.debtor_account.clone(),
                Amount::new(order.amount, Some(order.currency.clone())),
                Utc::now(),
            ),
        });

        Ok(payment_id)
    }
}
