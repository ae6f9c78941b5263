use super::*;

impl ProviderClient {
    /// Lists the client's cards.
    pub async fn list_cards(&self, client_id: &ClientId) -> AppResult<Vec<Card>> {
        let request = self.card_request(HttpMethod::Get, "/cards".to_owned(), client_id).await?;
        let body = self.send(request).await?;
        let now = Utc::now();

        self.map_list(payload::data_list(&body, "cards"), |value| {
            self.normalizer.card(self.provider(), value, now)
        })
    }

    /// Reads one card.
    pub async fn card_details(&self, client_id: &ClientId, card_id: &str) -> AppResult<Card> {
        let request = self
            .card_request(HttpMethod::Get, format!("/cards/{card_id}"), client_id)
            .await?;
        let body = self.send(request).await?;
        let data = payload::data(&body).ok_or_else(|| self.missing_data("card"))?;

        self.normalizer.card(self.provider(), data, Utc::now())
    }

    /// Issues a card on an existing account.
    pub async fn create_card(&self, client_id: &ClientId, new_card: &NewCard) -> AppResult<Card> {
        let request = self
            .card_request(HttpMethod::Post, "/cards".to_owned(), client_id)
            .await?
            .with_json(json!({
                "account_number": new_card.account_number,
                "card_type": new_card.card_type,
                "card_name": new_card.card_name,
            }));
        let body = self.send(request).await?;
        let data = payload::data(&body).ok_or_else(|| self.missing_data("issue card"))?;
        let card = self.normalizer.card(self.provider(), data, Utc::now())?;

        info!(
            provider = %self.provider(),
            client_id = %client_id,
            card_id = %card.card_id,
            "card issued"
        );

        Ok(card)
    }

    /// Deletes a card.
    pub async fn delete_card(&self, client_id: &ClientId, card_id: &str) -> AppResult<()> {
        let request = self
            .card_request(HttpMethod::Delete, format!("/cards/{card_id}"), client_id)
            .await?;
        self.send(request).await?;

        info!(
            provider = %self.provider(),
            client_id = %client_id,
            card_id = %card_id,
            "card deleted"
        );

        Ok(())
    }

    async fn card_request(
        &self,
        method: HttpMethod,
        path: String,
        client_id: &ClientId,
    ) -> AppResult<UpstreamRequest> {
        let consent_id = self.consents.ensure_active_consent(client_id).await?;
        Ok(self
            .under_account_consent(method, path, &consent_id)
            .await?
            .with_query("client_id", client_id.as_str()))
    }
}
