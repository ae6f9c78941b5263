use chrono::{DateTime, Duration, Utc};
use multibank_core::{AppError, AppResult, ClientId, ProviderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validity window of an account consent.
pub const ACCOUNT_CONSENT_VALIDITY_DAYS: i64 = 90;

/// Validity window of a product-agreement consent.
pub const PRODUCT_CONSENT_VALIDITY_DAYS: i64 = 364;

/// Which consent track a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentKind {
    /// Read and manage accounts, balances, transactions and cards.
    Account,
    /// Read, open and close product agreements.
    Product,
}

impl ConsentKind {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Product => "product",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "account" => Ok(Self::Account),
            "product" => Ok(Self::Product),
            _ => Err(AppError::Validation(format!(
                "unknown consent kind '{value}'"
            ))),
        }
    }

    /// Returns how long an approved consent of this kind stays valid.
    #[must_use]
    pub fn validity(self) -> Duration {
        match self {
            Self::Account => Duration::days(ACCOUNT_CONSENT_VALIDITY_DAYS),
            Self::Product => Duration::days(PRODUCT_CONSENT_VALIDITY_DAYS),
        }
    }
}

/// Lifecycle state of a consent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    /// Waiting for out-of-band end-user approval.
    Pending,
    /// Approved and usable until expiry.
    Approved,
    /// No longer usable.
    Expired,
}

impl ConsentStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Expired => "expired",
        }
    }

    /// Parses a stored or upstream status. `authorized` is an alias of `approved`.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "awaitingauthorization" => Ok(Self::Pending),
            "approved" | "authorized" => Ok(Self::Approved),
            "expired" => Ok(Self::Expired),
            _ => Err(AppError::Validation(format!(
                "unknown consent status '{value}'"
            ))),
        }
    }
}

/// Permission granted by an account consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountPermission {
    /// Read account details.
    ReadAccountsDetail,
    /// Read balances.
    ReadBalances,
    /// Read transaction details.
    ReadTransactionsDetail,
    /// Open and close accounts.
    ManageAccounts,
    /// Issue and delete cards.
    ManageCards,
    /// Read cards.
    ReadCards,
}

impl AccountPermission {
    /// Permission set requested for every account consent.
    pub const DEFAULT_SET: [Self; 6] = [
        Self::ReadAccountsDetail,
        Self::ReadBalances,
        Self::ReadTransactionsDetail,
        Self::ManageAccounts,
        Self::ManageCards,
        Self::ReadCards,
    ];

    /// Returns the wire name of the permission.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadAccountsDetail => "ReadAccountsDetail",
            Self::ReadBalances => "ReadBalances",
            Self::ReadTransactionsDetail => "ReadTransactionsDetail",
            Self::ManageAccounts => "ManageAccounts",
            Self::ManageCards => "ManageCards",
            Self::ReadCards => "ReadCards",
        }
    }

    /// Parses the wire name of a permission.
    pub fn parse(value: &str) -> AppResult<Self> {
        Self::DEFAULT_SET
            .into_iter()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown account permission '{value}'")))
    }
}

/// Terms of a product-agreement consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductConsentTerms {
    /// May list the client's agreements.
    pub read_product_agreements: bool,
    /// May open agreements.
    pub open_product_agreements: bool,
    /// May close agreements.
    pub close_product_agreements: bool,
    /// Product types the consent covers.
    pub allowed_product_types: Vec<String>,
    /// Ceiling on any single agreement amount.
    pub max_amount: Decimal,
}

impl Default for ProductConsentTerms {
    fn default() -> Self {
        Self {
            read_product_agreements: true,
            open_product_agreements: true,
            close_product_agreements: true,
            allowed_product_types: ["deposit", "loan", "card", "account", "credit_card"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            max_amount: Decimal::new(100_000_000, 2),
        }
    }
}

impl ProductConsentTerms {
    /// Returns true when the amount fits under the consent ceiling.
    #[must_use]
    pub fn allows_amount(&self, amount: Decimal) -> bool {
        amount <= self.max_amount
    }

    /// Returns true when the product type is covered by the consent.
    #[must_use]
    pub fn allows_product_type(&self, product_type: &str) -> bool {
        self.allowed_product_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(product_type))
    }
}

/// What a consent authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsentScope {
    /// Account data access.
    Account {
        /// Granted permissions.
        permissions: Vec<AccountPermission>,
    },
    /// Product-agreement operations.
    Product(ProductConsentTerms),
}

impl ConsentScope {
    /// Scope requested for account consents.
    #[must_use]
    pub fn default_account() -> Self {
        Self::Account {
            permissions: AccountPermission::DEFAULT_SET.to_vec(),
        }
    }

    /// Scope requested for product consents.
    #[must_use]
    pub fn default_product() -> Self {
        Self::Product(ProductConsentTerms::default())
    }

    /// Returns the consent track of this scope.
    #[must_use]
    pub fn kind(&self) -> ConsentKind {
        match self {
            Self::Account { .. } => ConsentKind::Account,
            Self::Product(_) => ConsentKind::Product,
        }
    }
}

/// Storage key of a consent: one record per kind, provider and client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsentKey {
    /// Consent track.
    pub kind: ConsentKind,
    /// Provider granting the consent.
    pub provider: ProviderId,
    /// Client the consent covers.
    pub client_id: ClientId,
}

impl ConsentKey {
    /// Creates a consent key.
    #[must_use]
    pub fn new(kind: ConsentKind, provider: ProviderId, client_id: ClientId) -> Self {
        Self {
            kind,
            provider,
            client_id,
        }
    }
}

/// Input payload used to rehydrate a stored consent.
#[derive(Debug, Clone)]
pub struct ConsentInput {
    /// Stable record identifier.
    pub record_id: Uuid,
    /// Provider granting the consent.
    pub provider: ProviderId,
    /// Client the consent covers.
    pub client_id: ClientId,
    /// Authorized scope.
    pub scope: ConsentScope,
    /// Upstream consent id, present once approved.
    pub consent_id: Option<String>,
    /// Upstream request id, present while pending.
    pub request_id: Option<String>,
    /// Lifecycle status.
    pub status: ConsentStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

/// Authorization to access a client's data at one provider.
///
/// Records are replaced wholesale on every transition; the only way to change
/// one is to build the successor value and upsert it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    record_id: Uuid,
    provider: ProviderId,
    client_id: ClientId,
    scope: ConsentScope,
    consent_id: Option<String>,
    request_id: Option<String>,
    status: ConsentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Consent {
    /// Creates a pending consent waiting on an upstream request.
    #[must_use]
    pub fn pending(
        provider: ProviderId,
        client_id: ClientId,
        scope: ConsentScope,
        request_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = now + scope.kind().validity();
        Self {
            record_id: Uuid::new_v4(),
            provider,
            client_id,
            scope,
            consent_id: None,
            request_id: Some(request_id.into()),
            status: ConsentStatus::Pending,
            created_at: now,
            updated_at: now,
            expires_at,
        }
    }

    /// Creates a consent that the provider approved synchronously.
    #[must_use]
    pub fn approved(
        provider: ProviderId,
        client_id: ClientId,
        scope: ConsentScope,
        consent_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = now + scope.kind().validity();
        Self {
            record_id: Uuid::new_v4(),
            provider,
            client_id,
            scope,
            consent_id: Some(consent_id.into()),
            request_id: None,
            status: ConsentStatus::Approved,
            created_at: now,
            updated_at: now,
            expires_at,
        }
    }

    /// Rehydrates a stored consent, checking the status/identifier pairing.
    pub fn from_input(input: ConsentInput) -> AppResult<Self> {
        if input.status == ConsentStatus::Approved && input.consent_id.is_none() {
            return Err(AppError::Validation(
                "approved consent requires a consent id".to_owned(),
            ));
        }

        if input.status == ConsentStatus::Pending && input.request_id.is_none() {
            return Err(AppError::Validation(
                "pending consent requires a request id".to_owned(),
            ));
        }

        Ok(Self {
            record_id: input.record_id,
            provider: input.provider,
            client_id: input.client_id,
            scope: input.scope,
            consent_id: input.consent_id,
            request_id: input.request_id,
            status: input.status,
            created_at: input.created_at,
            updated_at: input.updated_at,
            expires_at: input.expires_at,
        })
    }

    /// Returns the approved successor of this record. The validity window
    /// restarts at approval time and the upstream request id is dropped.
    #[must_use]
    pub fn into_approved(self, consent_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let expires_at = now + self.scope.kind().validity();
        Self {
            consent_id: Some(consent_id.into()),
            request_id: None,
            status: ConsentStatus::Approved,
            updated_at: now,
            expires_at,
            ..self
        }
    }

    /// Returns the expired successor of this record.
    #[must_use]
    pub fn into_expired(self, now: DateTime<Utc>) -> Self {
        Self {
            status: ConsentStatus::Expired,
            updated_at: now,
            ..self
        }
    }

    /// Returns the storage key.
    #[must_use]
    pub fn key(&self) -> ConsentKey {
        ConsentKey::new(self.kind(), self.provider, self.client_id.clone())
    }

    /// Returns the stable record identifier.
    #[must_use]
    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    /// Returns the consent track.
    #[must_use]
    pub fn kind(&self) -> ConsentKind {
        self.scope.kind()
    }

    /// Returns the granting provider.
    #[must_use]
    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// Returns the covered client.
    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Returns the authorized scope.
    #[must_use]
    pub fn scope(&self) -> &ConsentScope {
        &self.scope
    }

    /// Returns the upstream consent id, present once approved.
    #[must_use]
    pub fn consent_id(&self) -> Option<&str> {
        self.consent_id.as_deref()
    }

    /// Returns the upstream request id, present while pending.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> ConsentStatus {
        self.status
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last transition time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the expiry time.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true when the validity window has closed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns true when the consent is approved and unexpired at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ConsentStatus::Approved
            && self.consent_id.is_some()
            && !self.is_expired_at(now)
    }

    /// Returns true when the consent is approved and unexpired right now.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Returns true when the record waits on an upstream approval at `now`.
    #[must_use]
    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ConsentStatus::Pending && !self.is_expired_at(now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use multibank_core::{ClientId, ProviderId};
    use rust_decimal::Decimal;

    use super::{
        AccountPermission, Consent, ConsentInput, ConsentKind, ConsentScope, ConsentStatus,
        ProductConsentTerms,
    };

    fn client() -> ClientId {
        ClientId::new("team-1").unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn pending_consent_becomes_active_once_approved() {
        let now = Utc::now();
        let pending = Consent::pending(
            ProviderId::Abank,
            client(),
            ConsentScope::default_account(),
            "req-1",
            now,
        );
        assert!(!pending.is_active_at(now));
        assert!(pending.is_pending_at(now));

        let approved = pending.clone().into_approved("consent-1", now);
        assert!(approved.is_active_at(now));
        assert_eq!(approved.record_id(), pending.record_id());
        assert_eq!(approved.consent_id(), Some("consent-1"));
        assert_eq!(approved.request_id(), None);
        assert_eq!(approved.expires_at(), now + Duration::days(90));
    }

    #[test]
    fn consent_is_inactive_at_its_expiry_instant() {
        let now = Utc::now();
        let consent = Consent::approved(
            ProviderId::Sbank,
            client(),
            ConsentScope::default_account(),
            "consent-1",
            now,
        );

        assert!(consent.is_active_at(consent.expires_at() - Duration::seconds(1)));
        assert!(!consent.is_active_at(consent.expires_at()));
    }

    #[test]
    fn product_consents_last_longer_than_account_consents() {
        assert!(ConsentKind::Product.validity() > ConsentKind::Account.validity());
        assert_eq!(ConsentScope::default_product().kind(), ConsentKind::Product);
    }

    #[test]
    fn from_input_rejects_approved_without_consent_id() {
        let now = Utc::now();
        let result = Consent::from_input(ConsentInput {
            record_id: uuid::Uuid::new_v4(),
            provider: ProviderId::Vbank,
            client_id: client(),
            scope: ConsentScope::default_account(),
            consent_id: None,
            request_id: None,
            status: ConsentStatus::Approved,
            created_at: now,
            updated_at: now,
            expires_at: now,
        });

        assert!(result.is_err());
    }

    #[test]
    fn status_parsing_accepts_authorized_alias() {
        assert_eq!(
            ConsentStatus::parse("Authorized").ok(),
            Some(ConsentStatus::Approved)
        );
        assert!(ConsentStatus::parse("Rejected").is_err());
    }

    #[test]
    fn product_terms_enforce_amount_ceiling_and_types() {
        let terms = ProductConsentTerms::default();
        assert!(terms.allows_amount(Decimal::new(1_000_000, 0)));
        assert!(!terms.allows_amount(Decimal::new(1_000_001, 0)));
        assert!(terms.allows_product_type("Deposit"));
        assert!(!terms.allows_product_type("mortgage"));
    }

    #[test]
    fn permissions_round_trip_through_wire_names() {
        for permission in AccountPermission::DEFAULT_SET {
            assert_eq!(AccountPermission::parse(permission.as_str()).ok(), Some(permission));
        }
    }
}
