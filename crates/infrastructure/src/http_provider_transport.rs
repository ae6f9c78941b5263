use std::time::Duration;

use async_trait::async_trait;
use multibank_application::{HttpMethod, ProviderTransport, UpstreamRequest, UpstreamResponse};
use multibank_core::{AppError, AppResult, ProviderId};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// reqwest-backed transport for one provider's REST surface.
#[derive(Clone)]
pub struct HttpProviderTransport {
    http_client: reqwest::Client,
    provider: ProviderId,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpProviderTransport {
    /// Creates a transport rooted at the provider base URL.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        provider: ProviderId,
        base_url: Url,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            provider,
            base_url,
            request_timeout,
        }
    }

    /// Returns the provider base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');

        Url::parse(format!("{base}/{path}").as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid upstream url for provider '{}' and path '{path}': {error}",
                self.provider
            ))
        })
    }

    fn transport_error(&self, error: &reqwest::Error) -> AppError {
        if error.is_timeout() {
            return AppError::ProviderTimeout {
                provider: self.provider,
                timeout_ms: u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
            };
        }

        AppError::Provider {
            provider: self.provider,
            status: None,
            message: format!("transport error: {error}"),
        }
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl ProviderTransport for HttpProviderTransport {
    async fn execute(&self, request: UpstreamRequest) -> AppResult<UpstreamResponse> {
        let url = self.endpoint(request.path.as_str())?;

        let mut builder = self
            .http_client
            .request(reqwest_method(request.method), url)
            .timeout(self.request_timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(bearer) = request.bearer.as_deref() {
            builder = builder.bearer_auth(bearer);
        }

        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| self.transport_error(&error))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| self.transport_error(&error))?;

        debug!(
            provider = %self.provider,
            method = request.method.as_str(),
            path = %request.path,
            status = status.as_u16(),
            "upstream call completed"
        );

        if !status.is_success() {
            let message = if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("upstream request failed")
                    .to_owned()
            } else {
                text
            };

            return Err(AppError::Provider {
                provider: self.provider,
                status: Some(status.as_u16()),
                message,
            });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text.as_str()).map_err(|error| AppError::Provider {
                provider: self.provider,
                status: Some(status.as_u16()),
                message: format!("response body is not valid json: {error}"),
            })?
        };

        Ok(UpstreamResponse {
            status: status.as_u16(),
            body,
        })
    }
}
