use std::fmt;

use multibank_core::ProviderId;

use crate::provider_ports::{HttpMethod, UpstreamRequest};

/// Requesting bank name sent when none is configured.
pub const DEFAULT_REQUESTING_BANK_NAME: &str = "Multibank Aggregator";

/// Team credentials used for the token exchange at one provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Team client id; also sent as the requesting bank.
    pub client_id: String,
    /// Team client secret.
    pub client_secret: String,
}

impl ProviderCredentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Per-provider configuration record.
///
/// Providers differ only in this record and in their payload normalizer; all
/// token, consent and timeout handling is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Provider identity.
    pub provider: ProviderId,
    /// Team credentials.
    pub credentials: ProviderCredentials,
    /// Human-readable name sent with consent requests.
    pub requesting_bank_name: String,
    /// Headers added to every call, e.g. gateway keys.
    pub extra_headers: Vec<(String, String)>,
}

impl ProviderProfile {
    /// Creates a profile with the default requesting bank name and no extra headers.
    #[must_use]
    pub fn new(provider: ProviderId, credentials: ProviderCredentials) -> Self {
        Self {
            provider,
            credentials,
            requesting_bank_name: DEFAULT_REQUESTING_BANK_NAME.to_owned(),
            extra_headers: Vec::new(),
        }
    }

    /// Overrides the requesting bank name.
    #[must_use]
    pub fn with_requesting_bank_name(mut self, name: impl Into<String>) -> Self {
        self.requesting_bank_name = name.into();
        self
    }

    /// Adds a header sent with every call.
    #[must_use]
    pub fn with_extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the requesting bank identifier, the team client id.
    #[must_use]
    pub fn requesting_bank(&self) -> &str {
        &self.credentials.client_id
    }

    /// Starts a request carrying the JSON accept header and the extra headers.
    #[must_use]
    pub fn request(&self, method: HttpMethod, path: impl Into<String>) -> UpstreamRequest {
        let request = UpstreamRequest::new(self.provider, method, path)
            .with_header("accept", "application/json");

        self.extra_headers
            .iter()
            .fold(request, |request, (name, value)| {
                request.with_header(name.clone(), value.clone())
            })
    }
}
