use async_trait::async_trait;
use multibank_core::{AppResult, ClientId, ProviderId};
use multibank_domain::Account;

/// Port for anything the aggregation engine can fan out to.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Returns the provider this source reads from.
    fn provider(&self) -> ProviderId;

    /// Fetches every account of one client, with balances and transactions.
    async fn fetch_accounts(&self, client_id: &ClientId) -> AppResult<Vec<Account>>;
}
