use super::*;

const PAYMENT_CONSENT_REQUEST_PATH: &str = "/payment-consents/request";

impl ConsentService {
    /// Obtains a single-use payment consent for one debit.
    ///
    /// There is no polling variant: anything but an immediate `approved` answer
    /// fails with [`AppError::ConsentUnavailable`].
    pub async fn request_payment_consent(
        &self,
        client_id: &ClientId,
        debtor_account: &str,
        amount: Decimal,
    ) -> AppResult<String> {
        let bearer = self.tokens.bearer().await?;
        let request = self
            .profile
            .request(HttpMethod::Post, PAYMENT_CONSENT_REQUEST_PATH)
            .with_header("x-requesting-bank", self.profile.requesting_bank())
            .with_bearer(bearer)
            .with_json(payload::object([
                ("client_id", Value::from(client_id.as_str())),
                ("requesting_bank", Value::from(self.profile.requesting_bank())),
                ("consent_type", Value::from("single_use")),
                ("debtor_account", Value::from(debtor_account)),
                ("amount", payload::decimal_to_json(amount)),
            ]));

        let response = self.transport.execute(request).await?;
        let status = payload::string_field(&response.body, &["status"]).unwrap_or_default();
        let consent_id = payload::string_field(&response.body, &["consent_id", "consentId"]);

        match consent_id {
            Some(consent_id) if status == ConsentStatus::Approved.as_str() => {
                info!(
                    provider = %self.provider(),
                    client_id = %client_id,
                    consent_id = %consent_id,
                    "payment consent approved"
                );
                Ok(consent_id)
            }
            _ => {
                warn!(
                    provider = %self.provider(),
                    client_id = %client_id,
                    status = %status,
                    "payment consent was not approved"
                );
                Err(self.unavailable(
                    format!("payment consent answered with status '{status}'"),
                    payload::string_field(&response.body, &["request_id", "requestId"]),
                ))
            }
        }
    }
}
