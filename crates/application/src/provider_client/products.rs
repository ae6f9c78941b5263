use super::*;

const PRODUCT_AGREEMENTS_PATH: &str = "/product-agreements";

impl ProviderClient {
    /// Lists the provider's public product catalog. No consent is involved.
    pub async fn list_products_catalog(&self) -> AppResult<Vec<Product>> {
        let request = self.authorized(HttpMethod::Get, "/products").await?;
        let body = self.send(request).await?;

        self.map_list(payload::data_list(&body, "product"), |value| {
            self.normalizer.product(self.provider(), value)
        })
    }

    /// Lists the product agreements the client holds.
    pub async fn list_client_products(&self, client_id: &ClientId) -> AppResult<Vec<Product>> {
        let consent_id = self.consents.ensure_active_product_consent(client_id).await?;
        let request = self
            .under_product_consent(
                HttpMethod::Get,
                PRODUCT_AGREEMENTS_PATH,
                client_id,
                &consent_id,
            )
            .await?;
        let body = self.send(request).await?;

        self.map_list(payload::data_list(&body, "agreements"), |value| {
            self.normalizer.product(self.provider(), value)
        })
    }

    /// Opens a product agreement.
    ///
    /// The new agreement is looked up in the client's product list to publish
    /// [`DomainEvent::ProductPurchased`]; it is returned when found. A failed
    /// lookup does not fail the purchase.
    pub async fn buy_product(
        &self,
        client_id: &ClientId,
        purchase: &ProductPurchase,
    ) -> AppResult<Option<Product>> {
        let terms = &self.consents.policy().product_terms;
        if !terms.allows_amount(purchase.amount) {
            return Err(AppError::Validation(format!(
                "amount {} exceeds the product consent ceiling of {}",
                purchase.amount, terms.max_amount
            )));
        }
        if let Some(product_type) = purchase.product_type.as_deref()
            && !terms.allows_product_type(product_type)
        {
            return Err(AppError::Validation(format!(
                "product type '{product_type}' is not covered by the product consent"
            )));
        }

        let consent_id = self.consents.ensure_active_product_consent(client_id).await?;
        let request = self
            .under_product_consent(
                HttpMethod::Post,
                PRODUCT_AGREEMENTS_PATH,
                client_id,
                &consent_id,
            )
            .await?
            .with_json(payload::object([
                ("product_id", Value::from(purchase.product_id.as_str())),
                ("amount", payload::decimal_to_json(purchase.amount)),
                (
                    "source_account_id",
                    Value::from(purchase.source_account_id.as_str()),
                ),
            ]));
        self.send(request).await?;

        info!(
            provider = %self.provider(),
            client_id = %client_id,
            product_id = %purchase.product_id,
            "product purchased"
        );

        let purchased = match self.list_client_products(client_id).await {
            Ok(products) => products
                .into_iter()
                .find(|product| product.product_id == purchase.product_id),
            Err(error) => {
                warn!(
                    provider = %self.provider(),
                    client_id = %client_id,
                    error = %error,
                    "could not read back purchased product"
                );
                None
            }
        };

        if let Some(product) = purchased.as_ref() {
            self.publish(DomainEvent::ProductPurchased {
                client_id: client_id.clone(),
                product: product.clone(),
            });
        }

        Ok(purchased)
    }

    /// Closes a product agreement.
    pub async fn delete_product(
        &self,
        client_id: &ClientId,
        closure: &ProductClosure,
    ) -> AppResult<()> {
        let consent_id = self.consents.ensure_active_product_consent(client_id).await?;
        let request = self
            .under_product_consent(
                HttpMethod::Delete,
                format!("{PRODUCT_AGREEMENTS_PATH}/{}", closure.agreement_id),
                client_id,
                &consent_id,
            )
            .await?
            .with_json(payload::object([
                (
                    "repayment_account_id",
                    Value::from(closure.repayment_account_id.as_str()),
                ),
                (
                    "repayment_amount",
                    payload::decimal_to_json(closure.repayment_amount),
                ),
            ]));
        self.send(request).await?;

        info!(
            provider = %self.provider(),
            client_id = %client_id,
            agreement_id = %closure.agreement_id,
            "product agreement closed"
        );

        Ok(())
    }
}
