//! Hand-written port fakes shared by the service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use multibank_core::{AppError, AppResult, ClientId, ProviderId};
use multibank_domain::{Consent, ConsentKey, ConsentKind, ConsentStatus, DomainEvent};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::provider_ports::{
    ConsentStore, DomainEventPublisher, HttpMethod, ProviderTransport, UpstreamRequest,
    UpstreamResponse,
};
use crate::provider_profile::{ProviderCredentials, ProviderProfile};

pub(crate) fn client_id(value: &str) -> ClientId {
    ClientId::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn profile(provider: ProviderId) -> Arc<ProviderProfile> {
    Arc::new(
        ProviderProfile::new(provider, ProviderCredentials::new("team-1", "secret"))
            .with_extra_header("x-gateway-key", "gateway"),
    )
}

/// Transport answering from per-route scripts.
///
/// Each route replays its queued answers in order and repeats the last one.
/// The token endpoint answers with a fixed token unless scripted.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<AppResult<Value>>>>,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl ScriptedTransport {
    pub(crate) async fn respond(&self, method: HttpMethod, path: &str, body: Value) {
        self.push(method, path, Ok(body)).await;
    }

    pub(crate) async fn fail(&self, method: HttpMethod, path: &str, error: AppError) {
        self.push(method, path, Err(error)).await;
    }

    async fn push(&self, method: HttpMethod, path: &str, answer: AppResult<Value>) {
        self.routes
            .lock()
            .await
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(answer);
    }

    pub(crate) async fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().await.clone()
    }

    /// Requests excluding the token exchange.
    pub(crate) async fn data_requests(&self) -> Vec<UpstreamRequest> {
        self.requests()
            .await
            .into_iter()
            .filter(|request| request.path != "/auth/bank-token")
            .collect()
    }

    pub(crate) async fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }
}

#[async_trait]
impl ProviderTransport for ScriptedTransport {
    async fn execute(&self, request: UpstreamRequest) -> AppResult<UpstreamResponse> {
        self.requests.lock().await.push(request.clone());

        let key = (request.method, request.path.clone());
        let answer = {
            let mut routes = self.routes.lock().await;
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().map(|answer| match answer {
                    Ok(body) => Ok(body.clone()),
                    Err(error) => Err(clone_error(error)),
                }),
                None => None,
            }
        };

        match answer {
            Some(Ok(body)) => Ok(UpstreamResponse::ok(body)),
            Some(Err(error)) => Err(error),
            None if request.path == "/auth/bank-token" => Ok(UpstreamResponse::ok(
                json!({"access_token": "token", "expires_in": 86400}),
            )),
            None => Err(AppError::Provider {
                provider: request.provider,
                status: Some(404),
                message: format!("no script for {} {}", request.method.as_str(), request.path),
            }),
        }
    }
}

fn clone_error(error: &AppError) -> AppError {
    match error {
        AppError::ProviderTimeout {
            provider,
            timeout_ms,
        } => AppError::ProviderTimeout {
            provider: *provider,
            timeout_ms: *timeout_ms,
        },
        AppError::Provider {
            provider,
            status,
            message,
        } => AppError::Provider {
            provider: *provider,
            status: *status,
            message: message.clone(),
        },
        other => AppError::Internal(other.to_string()),
    }
}

/// Consent store keeping one record per key.
#[derive(Default)]
pub(crate) struct FakeConsentStore {
    records: Mutex<HashMap<ConsentKey, Consent>>,
    upserts: Mutex<Vec<Consent>>,
}

impl FakeConsentStore {
    pub(crate) async fn seed(&self, consent: Consent) {
        self.records.lock().await.insert(consent.key(), consent);
    }

    pub(crate) async fn upserts(&self) -> Vec<Consent> {
        self.upserts.lock().await.clone()
    }

    pub(crate) async fn get(&self, key: &ConsentKey) -> Option<Consent> {
        self.records.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl ConsentStore for FakeConsentStore {
    async fn upsert(&self, consent: Consent) -> AppResult<()> {
        self.upserts.lock().await.push(consent.clone());
        self.records.lock().await.insert(consent.key(), consent);
        Ok(())
    }

    async fn find(&self, key: &ConsentKey) -> AppResult<Option<Consent>> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn find_active(
        &self,
        key: &ConsentKey,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Consent>> {
        Ok(self
            .records
            .lock()
            .await
            .get(key)
            .filter(|consent| consent.is_active_at(now))
            .cloned())
    }

    async fn find_pending(&self, key: &ConsentKey) -> AppResult<Option<Consent>> {
        Ok(self
            .records
            .lock()
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
            .records
            .lock()
            .await
            .values()
            .find(|consent| consent.kind() == kind && consent.consent_id() == Some(consent_id))
            .cloned())
    }
}

/// Publisher recording every event.
#[derive(Default)]
pub(crate) struct RecordingPublisher {
    events: StdMutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub(crate) fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DomainEventPublisher for RecordingPublisher {
    fn publish(&self, event: DomainEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
