use async_trait::async_trait;
use chrono::{DateTime, Utc};
use multibank_application::ConsentStore;
use multibank_core::{AppError, AppResult, ClientId, ProviderId};
use multibank_domain::{
    Consent, ConsentInput, ConsentKey, ConsentKind, ConsentScope, ConsentStatus,
};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// PostgreSQL-backed consent store.
///
/// One row per `(kind, provider, client_id)`; upserts resolve as last writer wins.
#[derive(Clone)]
pub struct PostgresConsentStore {
    pool: PgPool,
}

impl PostgresConsentStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ConsentRow {
    record_id: Uuid,
    provider: String,
    client_id: String,
    scope: Value,
    consent_id: Option<String>,
    request_id: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ConsentRow {
    fn into_consent(self) -> AppResult<Consent> {
        let scope: ConsentScope = serde_json::from_value(self.scope).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode scope of consent record '{}': {error}",
                self.record_id
            ))
        })?;

        Consent::from_input(ConsentInput {
            record_id: self.record_id,
            provider: ProviderId::parse(self.provider.as_str())?,
            client_id: ClientId::new(self.client_id)?,
            scope,
            consent_id: self.consent_id,
            request_id: self.request_id,
            status: ConsentStatus::parse(self.status.as_str())?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
        })
    }
}

const SELECT_CONSENT: &str = r#"
    SELECT
        record_id,
        provider,
        client_id,
        scope,
        consent_id,
        request_id,
        status,
        created_at,
        updated_at,
        expires_at
    FROM provider_consents
"#;

impl PostgresConsentStore {
    async fn fetch_by_key(&self, key: &ConsentKey) -> AppResult<Option<Consent>> {
        let row = sqlx::query_as::<_, ConsentRow>(
            format!("{SELECT_CONSENT} WHERE kind = $1 AND provider = $2 AND client_id = $3")
                .as_str(),
        )
        .bind(key.kind.as_str())
        .bind(key.provider.as_str())
        .bind(key.client_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load {} consent for provider '{}' and client '{}': {error}",
                key.kind.as_str(),
                key.provider,
                key.client_id
            ))
        })?;

        row.map(ConsentRow::into_consent).transpose()
    }
}

#[async_trait]
impl ConsentStore for PostgresConsentStore {
    async fn upsert(&self, consent: Consent) -> AppResult<()> {
        let scope = serde_json::to_value(consent.scope()).map_err(|error| {
            AppError::Internal(format!("failed to encode consent scope: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO provider_consents (
                record_id,
                kind,
                provider,
                client_id,
                scope,
                consent_id,
                request_id,
                status,
                created_at,
                updated_at,
                expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (kind, provider, client_id) DO UPDATE SET
                record_id = EXCLUDED.record_id,
                scope = EXCLUDED.scope,
                consent_id = EXCLUDED.consent_id,
                request_id = EXCLUDED.request_id,
                status = EXCLUDED.status,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(consent.record_id())
        .bind(consent.kind().as_str())
        .bind(consent.provider().as_str())
        .bind(consent.client_id().as_str())
        .bind(scope)
        .bind(consent.consent_id())
        .bind(consent.request_id())
        .bind(consent.status().as_str())
        .bind(consent.created_at())
        .bind(consent.updated_at())
        .bind(consent.expires_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to upsert {} consent for provider '{}' and client '{}': {error}",
                consent.kind().as_str(),
                consent.provider(),
                consent.client_id()
            ))
        })?;

        Ok(())
    }

    async fn find(&self, key: &ConsentKey) -> AppResult<Option<Consent>> {
        self.fetch_by_key(key).await
    }

    async fn find_active(
        &self,
        key: &ConsentKey,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Consent>> {
        Ok(self
            .fetch_by_key(key)
            .await?
            .filter(|consent| consent.is_active_at(now)))
    }

    async fn find_pending(&self, key: &ConsentKey) -> AppResult<Option<Consent>> {
        Ok(self
            .fetch_by_key(key)
            .await?
            .filter(|consent| consent.status() == ConsentStatus::Pending))
    }

    async fn find_by_consent_id(
        &self,
        kind: ConsentKind,
        consent_id: &str,
    ) -> AppResult<Option<Consent>> {
        let row = sqlx::query_as::<_, ConsentRow>(
            format!("{SELECT_CONSENT} WHERE kind = $1 AND consent_id = $2 ORDER BY updated_at DESC LIMIT 1")
                .as_str(),
        )
        .bind(kind.as_str())
        .bind(consent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load {} consent '{consent_id}': {error}",
                kind.as_str()
            ))
        })?;

        row.map(ConsentRow::into_consent).transpose()
    }
}
