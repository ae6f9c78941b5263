use super::*;

use super::upstream::ConsentReply;

impl ConsentService {
    /// Returns an approved, unexpired account consent id for the client.
    ///
    /// A stored active consent is returned without any upstream call. Otherwise
    /// one request and poll cycle runs; if the consent is still awaiting
    /// end-user approval after it, the call fails with
    /// [`AppError::ConsentUnavailable`] carrying the pending request id.
    pub async fn ensure_active_consent(&self, client_id: &ClientId) -> AppResult<String> {
        self.ensure(ConsentKind::Account, client_id).await
    }

    /// Returns an approved, unexpired product-agreement consent id for the client.
    pub async fn ensure_active_product_consent(&self, client_id: &ClientId) -> AppResult<String> {
        self.ensure(ConsentKind::Product, client_id).await
    }

    /// Reports the stored consent state without calling the provider.
    pub async fn consent_state(
        &self,
        kind: ConsentKind,
        client_id: &ClientId,
    ) -> AppResult<ConsentState> {
        let key = ConsentKey::new(kind, self.provider(), client_id.clone());
        let now = Utc::now();

        let Some(consent) = self.store.find(&key).await? else {
            return Ok(ConsentState::Absent);
        };

        if consent.is_active_at(now)
            && let Some(consent_id) = consent.consent_id()
        {
            return Ok(ConsentState::Active {
                consent_id: consent_id.to_owned(),
                expires_at: consent.expires_at(),
            });
        }

        if consent.is_pending_at(now)
            && let Some(request_id) = consent.request_id()
        {
            return Ok(ConsentState::Pending {
                request_id: request_id.to_owned(),
            });
        }

        Ok(ConsentState::Expired {
            expired_at: consent.expires_at(),
        })
    }

    async fn ensure(&self, kind: ConsentKind, client_id: &ClientId) -> AppResult<String> {
        let key = ConsentKey::new(kind, self.provider(), client_id.clone());
        let now = Utc::now();

        if let Some(active) = self.store.find_active(&key, now).await?
            && let Some(consent_id) = active.consent_id()
        {
            return Ok(consent_id.to_owned());
        }

        if let Some(pending) = self.store.find_pending(&key).await? {
            if pending.is_pending_at(now) {
                info!(
                    provider = %self.provider(),
                    client_id = %client_id,
                    kind = kind.as_str(),
                    "re-checking pending consent"
                );
                return self.poll_pending(pending).await;
            }

            self.retire(pending, now).await?;
        } else if let Some(stale) = self.store.find(&key).await?
            && stale.status() == ConsentStatus::Approved
        {
            self.retire(stale, now).await?;
        }

        self.request_fresh(kind, client_id).await
    }

    async fn retire(&self, consent: Consent, now: DateTime<Utc>) -> AppResult<()> {
        info!(
            provider = %self.provider(),
            client_id = %consent.client_id(),
            kind = consent.kind().as_str(),
            expired_at = %consent.expires_at(),
            "consent expired, requesting a new one"
        );
        self.store.upsert(consent.into_expired(now)).await
    }

    async fn request_fresh(&self, kind: ConsentKind, client_id: &ClientId) -> AppResult<String> {
        let scope = self.scope_for(kind);
        info!(
            provider = %self.provider(),
            client_id = %client_id,
            kind = kind.as_str(),
            "requesting consent"
        );

        let reply = self.request_upstream(&scope, client_id).await?;
        let now = Utc::now();

        match reply.status() {
            Some(ConsentStatus::Approved) => {
                let consent_id = reply.consent_id.ok_or_else(|| {
                    self.unavailable("approved consent response carries no consent id", None)
                })?;
                let consent = Consent::approved(
                    self.provider(),
                    client_id.clone(),
                    scope,
                    consent_id.clone(),
                    now,
                );
                self.store.upsert(consent).await?;
                info!(
                    provider = %self.provider(),
                    client_id = %client_id,
                    consent_id = %consent_id,
                    "consent approved"
                );
                Ok(consent_id)
            }
            Some(ConsentStatus::Pending) => {
                let request_id = reply.request_id.or(reply.consent_id).ok_or_else(|| {
                    self.unavailable("pending consent response carries no request id", None)
                })?;
                let pending = Consent::pending(
                    self.provider(),
                    client_id.clone(),
                    scope,
                    request_id.clone(),
                    now,
                );
                self.store.upsert(pending.clone()).await?;
                info!(
                    provider = %self.provider(),
                    client_id = %client_id,
                    request_id = %request_id,
                    "consent request sent for approval"
                );

                tokio::time::sleep(self.policy.poll_delay).await;
                self.poll_pending(pending).await
            }
            _ => Err(self.unavailable(
                format!("consent request answered with status '{}'", reply.raw_status),
                None,
            )),
        }
    }

    /// Polls once. Still pending is reported through the error, not retried.
    async fn poll_pending(&self, pending: Consent) -> AppResult<String> {
        let Some(request_id) = pending.request_id().map(str::to_owned) else {
            return Err(self.unavailable("pending consent has no request id", None));
        };

        let reply = match self.poll_upstream(pending.kind(), &request_id).await {
            Ok(reply) => Some(reply),
            Err(error @ AppError::TokenAcquisition { .. }) => return Err(error),
            Err(error) => {
                warn!(
                    provider = %self.provider(),
                    request_id = %request_id,
                    error = %error,
                    "consent status poll failed"
                );
                None
            }
        };

        if let Some(ConsentReply {
            consent_id: Some(consent_id),
            ..
        }) = reply
            .as_ref()
            .filter(|reply| reply.status() == Some(ConsentStatus::Approved))
        {
            let consent_id = consent_id.clone();
            let client_id = pending.client_id().clone();
            self.store
                .upsert(pending.into_approved(consent_id.clone(), Utc::now()))
                .await?;
            info!(
                provider = %self.provider(),
                client_id = %client_id,
                consent_id = %consent_id,
                "consent authorized"
            );
            return Ok(consent_id);
        }

        let status = reply.map_or_else(|| "unknown".to_owned(), |reply| reply.raw_status);
        info!(
            provider = %self.provider(),
            client_id = %pending.client_id(),
            request_id = %request_id,
            status = %status,
            "consent awaits manual approval in the provider's client portal"
        );

        Err(self.unavailable(
            format!("consent is awaiting end-user approval (status '{status}')"),
            Some(request_id),
        ))
    }
}
