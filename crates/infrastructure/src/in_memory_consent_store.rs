use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use multibank_application::ConsentStore;
use multibank_core::AppResult;
use multibank_domain::{Consent, ConsentKey, ConsentKind, ConsentStatus};
use tokio::sync::RwLock;

/// In-memory consent store for tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryConsentStore {
    consents: RwLock<HashMap<ConsentKey, Consent>>,
}

impl InMemoryConsentStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            consents: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.consents.read().await.len()
    }

    /// Returns true when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.consents.read().await.is_empty()
    }
}

#[async_trait]
impl ConsentStore for InMemoryConsentStore {
    async fn upsert(&self, consent: Consent) -> AppResult<()> {
        self.consents.write().await.insert(consent.key(), consent);
        Ok(())
    }

    async fn find(&self, key: &ConsentKey) -> AppResult<Option<Consent>> {
        Ok(self.consents.read().await.get(key).cloned())
    }

    async fn find_active(
        &self,
        key: &ConsentKey,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Consent>> {
        Ok(self
            .consents
            .read()
            .await
            .get(key)
            .filter(|consent| consent.is_active_at(now))
            .cloned())
    }

    async fn find_pending(&self, key: &ConsentKey) -> AppResult<Option<Consent>> {
        Ok(self
            .consents
            .read()
            .await
            .get(key)
            .filter(|consent| consent.status() == ConsentStatus::Pending)
            .cloned())
    }

    async fn find_by_consent_id(
        &self,
        kind: ConsentKind,
        consent_id: &str,
    ) -> AppResult<Option<Consent>> {
        Ok(self
            .consents
            .read()
            .await
            .values()
            .find(|consent| consent.kind() == kind && consent.consent_id() == Some(consent_id))
            .cloned())
    }
}
