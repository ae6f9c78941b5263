//! Shared primitives for all Rust crates in Multibank.

#![forbid(unsafe_code)]

/// Banking provider identifiers.
pub mod provider;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use provider::ProviderId;

/// Result type used across Multibank crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// End-user identifier at the upstream providers.
///
/// Together with a [`ProviderId`] it forms the key of every consent record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Creates a client identifier, rejecting blank values.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = NonEmptyString::new(value).map_err(|_| {
            AppError::Validation("client id must not be empty or whitespace".to_owned())
        })?;
        Ok(Self(String::from(value).trim().to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for ClientId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClientId> for String {
    fn from(value: ClientId) -> Self {
        value.0
    }
}

impl Display for ClientId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Provider auth endpoint was unreachable or rejected the credential exchange.
    #[error("token acquisition failed for provider '{provider}': {message}")]
    TokenAcquisition {
        /// Provider whose auth endpoint failed.
        provider: ProviderId,
        /// Failure detail.
        message: String,
    },

    /// No approved consent exists after one full request and poll cycle.
    #[error("consent unavailable for provider '{provider}': {message}")]
    ConsentUnavailable {
        /// Provider the consent was requested from.
        provider: ProviderId,
        /// Failure detail.
        message: String,
        /// Upstream request still waiting for end-user approval, if any.
        pending_request_id: Option<String>,
    },

    /// Provider call exceeded its time budget.
    #[error("provider '{provider}' timed out after {timeout_ms} ms")]
    ProviderTimeout {
        /// Provider that did not answer in time.
        provider: ProviderId,
        /// Time budget in milliseconds.
        timeout_ms: u64,
    },

    /// Provider answered with a non-success status or an unusable payload.
    #[error("provider '{provider}' error{}: {message}", status_suffix(.status))]
    Provider {
        /// Provider that failed.
        provider: ProviderId,
        /// HTTP status code, when the failure came from a response.
        status: Option<u16>,
        /// Failure detail.
        message: String,
    },

    /// Upstream record could not be mapped into the normalized model.
    #[error("mapping error for provider '{provider}': {message}")]
    Mapping {
        /// Provider whose payload was malformed.
        provider: ProviderId,
        /// Failure detail.
        message: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (status {code})"))
        .unwrap_or_default()
}

impl AppError {
    /// Returns the provider this error originated from, when it is provider scoped.
    #[must_use]
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            Self::TokenAcquisition { provider, .. }
            | Self::ConsentUnavailable { provider, .. }
            | Self::ProviderTimeout { provider, .. }
            | Self::Provider { provider, .. }
            | Self::Mapping { provider, .. } => Some(*provider),
            Self::Validation(_) | Self::NotFound(_) | Self::Internal(_) => None,
        }
    }

    /// Returns true when the error is a consent still waiting for end-user approval.
    #[must_use]
    pub fn is_consent_pending(&self) -> bool {
        matches!(
            self,
            Self::ConsentUnavailable {
                pending_request_id: Some(_),
                ..
            }
        )
    }
}
