use super::*;

const ACCOUNT_CONSENT_REQUEST_PATH: &str = "/account-consents/request";
const PRODUCT_CONSENT_REQUEST_PATH: &str = "/product-agreement-consents/request";

/// Consent status as answered by the provider.
#[derive(Debug, Clone)]
pub(super) struct ConsentReply {
    pub(super) raw_status: String,
    pub(super) consent_id: Option<String>,
    pub(super) request_id: Option<String>,
}

impl ConsentReply {
    fn from_payload(value: &Value) -> Self {
        Self {
            raw_status: payload::string_field(value, &["status"]).unwrap_or_default(),
            consent_id: payload::string_field(value, &["consent_id", "consentId"]),
            request_id: payload::string_field(value, &["request_id", "requestId"]),
        }
    }

    pub(super) fn status(&self) -> Option<ConsentStatus> {
        ConsentStatus::parse(&self.raw_status).ok()
    }
}

impl ConsentService {
    pub(super) async fn request_upstream(
        &self,
        scope: &ConsentScope,
        client_id: &ClientId,
    ) -> AppResult<ConsentReply> {
        let bearer = self.tokens.bearer().await?;

        let request = match scope {
            ConsentScope::Account { permissions } => {
                let permissions: Vec<&str> = permissions
                    .iter()
                    .map(|permission| permission.as_str())
                    .collect();

                self.profile
                    .request(HttpMethod::Post, ACCOUNT_CONSENT_REQUEST_PATH)
                    .with_header("x-requesting-bank", self.profile.requesting_bank())
                    .with_json(json!({
                        "client_id": client_id.as_str(),
                        "permissions": permissions,
                        "reason": self.policy.account_reason,
                        "requesting_bank": self.profile.requesting_bank(),
                        "requesting_bank_name": self.profile.requesting_bank_name,
                    }))
            }
            ConsentScope::Product(terms) => self
                .profile
                .request(HttpMethod::Post, PRODUCT_CONSENT_REQUEST_PATH)
                .with_query("client_id", client_id.as_str())
                .with_header("client_id", client_id.as_str())
                .with_json(json!({
                    "requesting_bank": self.profile.requesting_bank(),
                    "client_id": client_id.as_str(),
                    "read_product_agreements": terms.read_product_agreements,
                    "open_product_agreements": terms.open_product_agreements,
                    "close_product_agreements": terms.close_product_agreements,
                    "allowed_product_types": terms.allowed_product_types,
                    "max_amount": payload::decimal_to_json(terms.max_amount),
                    "reason": self.policy.product_reason,
                })),
        }
        .with_bearer(bearer);

        let response = self.transport.execute(request).await?;
        Ok(ConsentReply::from_payload(&response.body))
    }

    pub(super) async fn poll_upstream(
        &self,
        kind: ConsentKind,
        request_id: &str,
    ) -> AppResult<ConsentReply> {
        let bearer = self.tokens.bearer().await?;
        let path = match kind {
            ConsentKind::Account => format!("/account-consents/{request_id}"),
            ConsentKind::Product => format!("/product-agreement-consents/{request_id}"),
        };

        let request = self
            .profile
            .request(HttpMethod::Get, path)
            .with_header("x-fapi-interaction-id", self.profile.requesting_bank())
            .with_bearer(bearer);

        let response = self.transport.execute(request).await?;
        let status = payload::data(&response.body).unwrap_or(&response.body);

        Ok(ConsentReply::from_payload(status))
    }
}
