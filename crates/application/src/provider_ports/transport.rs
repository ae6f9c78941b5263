use async_trait::async_trait;
use multibank_core::{AppResult, ProviderId};
use serde_json::Value;

/// HTTP method of an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// One call against a provider's REST surface, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    /// Provider being called.
    pub provider: ProviderId,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the provider base URL, starting with `/`.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// Extra request headers in order.
    pub headers: Vec<(String, String)>,
    /// Bearer token for the `Authorization` header.
    pub bearer: Option<String>,
    /// JSON request body.
    pub body: Option<Value>,
}

impl UpstreamRequest {
    /// Creates a request with no query, headers, token or body.
    #[must_use]
    pub fn new(provider: ProviderId, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            provider,
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            bearer: None,
            body: None,
        }
    }

    /// Appends one query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends one header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_bearer(mut self, bearer: impl Into<String>) -> Self {
        self.bearer = Some(bearer.into());
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the first header value with the given name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the first query value with the given name.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(parameter, _)| parameter == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Successful upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// 2xx status code.
    pub status: u16,
    /// Parsed JSON body, `Null` when the body was empty.
    pub body: Value,
}

impl UpstreamResponse {
    /// Creates a 200 response with the given body.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

/// Port for executing calls against one provider.
///
/// Non-2xx statuses are returned as [`multibank_core::AppError::Provider`] and
/// transport timeouts as [`multibank_core::AppError::ProviderTimeout`].
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Executes one upstream call.
    async fn execute(&self, request: UpstreamRequest) -> AppResult<UpstreamResponse>;
}
