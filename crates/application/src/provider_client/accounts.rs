use multibank_domain::Balance;

use super::*;

impl ProviderClient {
    /// Fetches every account of the client with balances and transactions merged in.
    ///
    /// A failed balance or transaction fetch fails the whole call: a partially
    /// populated account would skew downstream totals.
    pub async fn fetch_accounts(&self, client_id: &ClientId) -> AppResult<Vec<Account>> {
        let consent_id = self.consents.ensure_active_consent(client_id).await?;
        let request = self
            .under_account_consent(HttpMethod::Get, "/accounts", &consent_id)
            .await?
            .with_query("client_id", client_id.as_str());

        let body = self.send(request).await?;
        let mut accounts = self.map_list(payload::data_list(&body, "account"), |value| {
            self.normalizer.account(self.provider(), value)
        })?;

        for account in &mut accounts {
            let (balances, transactions) = tokio::try_join!(
                self.fetch_balances(&account.account_id, &consent_id),
                self.fetch_transactions(&account.account_id, &consent_id),
            )?;
            account.apply_balances(&balances);
            account.transactions = transactions;
        }

        info!(
            provider = %self.provider(),
            client_id = %client_id,
            accounts = accounts.len(),
            "fetched accounts"
        );

        Ok(accounts)
    }

    async fn fetch_balances(&self, account_id: &str, consent_id: &str) -> AppResult<Vec<Balance>> {
        let request = self
            .under_account_consent(
                HttpMethod::Get,
                format!("/accounts/{account_id}/balances"),
                consent_id,
            )
            .await?;

        let body = self.send(request).await?;
        self.map_list(payload::data_list(&body, "balance"), |value| {
            self.normalizer.balance(self.provider(), value)
        })
    }

    async fn fetch_transactions(
        &self,
        account_id: &str,
        consent_id: &str,
    ) -> AppResult<Vec<Transaction>> {
        let request = self
            .under_account_consent(
                HttpMethod::Get,
                format!("/accounts/{account_id}/transactions"),
                consent_id,
            )
            .await?;

        let body = self.send(request).await?;
        self.map_list(payload::data_list(&body, "transaction"), |value| {
            self.normalizer
                .transaction(self.provider(), account_id, value)
        })
    }

    /// Opens an account and publishes [`DomainEvent::AccountOpened`].
    pub async fn create_account(
        &self,
        client_id: &ClientId,
        new_account: &NewAccount,
    ) -> AppResult<Account> {
        let consent_id = self.consents.ensure_active_consent(client_id).await?;
        let request = self
            .under_account_consent(HttpMethod::Post, "/accounts", &consent_id)
            .await?
            .with_query("client_id", client_id.as_str())
            .with_header("client_id", client_id.as_str())
            .with_json(payload::object([
                ("account_type", Value::from(new_account.account_type.as_str())),
                (
                    "initial_balance",
                    payload::decimal_to_json(new_account.initial_balance),
                ),
            ]));

        let body = self.send(request).await?;
        let data = payload::data(&body).ok_or_else(|| self.missing_data("open account"))?;
        let account = self.normalizer.account(self.provider(), data)?;

        info!(
            provider = %self.provider(),
            client_id = %client_id,
            account_id = %account.account_id,
            "account opened"
        );
        self.publish(DomainEvent::AccountOpened {
            client_id: client_id.clone(),
            account: account.clone(),
        });

        Ok(account)
    }

    /// Closes an account and publishes [`DomainEvent::AccountClosed`].
    pub async fn close_account(
        &self,
        client_id: &ClientId,
        closure: &AccountClosure,
    ) -> AppResult<()> {
        let consent_id = self.consents.ensure_active_consent(client_id).await?;
        let request = self
            .under_account_consent(
                HttpMethod::Put,
                format!("/accounts/{}/close", closure.account_id),
                &consent_id,
            )
            .await?
            .with_query("client_id", client_id.as_str())
            .with_header("client_id", client_id.as_str())
            .with_json(json!({
                "action": closure.action,
                "destination_account_id": closure.destination_account_id,
            }));

        self.send(request).await?;

        info!(
            provider = %self.provider(),
            client_id = %client_id,
            account_id = %closure.account_id,
            "account closed"
        );
        self.publish(DomainEvent::AccountClosed {
            client_id: client_id.clone(),
            provider: self.provider(),
            closure: closure.clone(),
        });

        Ok(())
    }
}
