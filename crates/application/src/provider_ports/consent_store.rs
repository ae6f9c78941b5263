use async_trait::async_trait;
use chrono::{DateTime, Utc};
use multibank_core::AppResult;
use multibank_domain::{Consent, ConsentKey, ConsentKind};

/// Durable consent persistence port.
///
/// Implementations keep at most one record per [`ConsentKey`]; concurrent
/// upserts for the same key resolve as last writer wins.
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Inserts or replaces the record for the consent's key.
    async fn upsert(&self, consent: Consent) -> AppResult<()>;

    /// Returns the record for one key, whatever its status.
    async fn find(&self, key: &ConsentKey) -> AppResult<Option<Consent>>;

    /// Returns the record for one key when it is approved and unexpired at `now`.
    async fn find_active(&self, key: &ConsentKey, now: DateTime<Utc>)
    -> AppResult<Option<Consent>>;

    /// Returns the record for one key when it is pending.
    async fn find_pending(&self, key: &ConsentKey) -> AppResult<Option<Consent>>;

    /// Returns the record carrying an upstream consent id.
    async fn find_by_consent_id(
        &self,
        kind: ConsentKind,
        consent_id: &str,
    ) -> AppResult<Option<Consent>>;
}
