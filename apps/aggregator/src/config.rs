use std::env;
use std::time::Duration;

use multibank_application::DEFAULT_REQUESTING_BANK_NAME;
use multibank_core::{AppError, AppResult, ProviderId};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Connection settings of one provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpointConfig {
    pub provider: ProviderId,
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub extra_headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub client_id: String,
    pub provider_filter: Vec<ProviderId>,
    pub providers: Vec<ProviderEndpointConfig>,
    pub requesting_bank_name: String,
    pub aggregation_timeout: Duration,
    pub http_timeout: Duration,
    pub consent_poll_delay: Duration,
    pub token_safety_margin: chrono::Duration,
    pub event_channel_capacity: usize,
    pub database_url: Option<String>,
}

impl AggregatorConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let vars = Vars(&lookup);

        let client_id = vars.required("MULTIBANK_CLIENT_ID")?;
        let provider_filter = vars
            .optional("MULTIBANK_PROVIDERS")
            .map(|value| parse_provider_list(value.as_str()))
            .transpose()?
            .unwrap_or_default();

        let mut providers = Vec::new();
        for provider in ProviderId::ALL {
            if let Some(endpoint) = provider_endpoint(&vars, provider)? {
                providers.push(endpoint);
            }
        }
        if providers.is_empty() {
            return Err(AppError::Validation(
                "at least one MULTIBANK_<PROVIDER>_BASE_URL must be set".to_owned(),
            ));
        }

        let token_safety_margin_seconds =
            vars.parse_u64("MULTIBANK_TOKEN_SAFETY_MARGIN_SECONDS", 3600)?;
        let token_safety_margin = i64::try_from(token_safety_margin_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "MULTIBANK_TOKEN_SAFETY_MARGIN_SECONDS is out of range: {token_safety_margin_seconds}"
                ))
            })?;

        Ok(Self {
            client_id,
            provider_filter,
            providers,
            requesting_bank_name: vars
                .optional("MULTIBANK_REQUESTING_BANK_NAME")
                .unwrap_or_else(|| DEFAULT_REQUESTING_BANK_NAME.to_owned()),
            aggregation_timeout: Duration::from_secs(
                vars.parse_u64("MULTIBANK_AGGREGATION_TIMEOUT_SECONDS", 30)?,
            ),
            http_timeout: Duration::from_secs(vars.parse_u64("MULTIBANK_HTTP_TIMEOUT_SECONDS", 15)?),
            consent_poll_delay: Duration::from_millis(
                vars.parse_u64("MULTIBANK_CONSENT_POLL_DELAY_MS", 5000)?,
            ),
            token_safety_margin,
            event_channel_capacity: vars.parse_usize("MULTIBANK_EVENT_CHANNEL_CAPACITY", 1024)?,
            database_url: vars.optional("DATABASE_URL"),
        })
    }
}

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> AppResult<String> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn parse_u64(&self, name: &str, default: u64) -> AppResult<u64> {
        match self.optional(name) {
            Some(value) => value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }

    fn parse_usize(&self, name: &str, default: usize) -> AppResult<usize> {
        match self.optional(name) {
            Some(value) => value.parse::<usize>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }
}

fn provider_endpoint<F: Fn(&str) -> Option<String>>(
    vars: &Vars<'_, F>,
    provider: ProviderId,
) -> AppResult<Option<ProviderEndpointConfig>> {
    let prefix = format!("MULTIBANK_{}", provider.as_str().to_ascii_uppercase());
    let base_url_name = format!("{prefix}_BASE_URL");

    let Some(base_url) = vars.optional(base_url_name.as_str()) else {
        return Ok(None);
    };
    let base_url = Url::parse(base_url.as_str()).map_err(|error| {
        AppError::Validation(format!("invalid {base_url_name} '{base_url}': {error}"))
    })?;

    let extra_headers = vars
        .optional(format!("{prefix}_EXTRA_HEADERS").as_str())
        .map(|value| parse_extra_headers(value.as_str()))
        .transpose()?
        .unwrap_or_default();

    Ok(Some(ProviderEndpointConfig {
        provider,
        base_url,
        client_id: vars.required(format!("{prefix}_CLIENT_ID").as_str())?,
        client_secret: vars.required(format!("{prefix}_CLIENT_SECRET").as_str())?,
        extra_headers,
    }))
}

fn parse_provider_list(value: &str) -> AppResult<Vec<ProviderId>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(ProviderId::parse)
        .collect()
}

fn parse_extra_headers(value: &str) -> AppResult<Vec<(String, String)>> {
    value
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, header_value) = pair.split_once('=').ok_or_else(|| {
                AppError::Validation(format!("extra header '{pair}' must be name=value"))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Validation(format!(
                    "extra header '{pair}' has an empty name"
                )));
            }
            Ok((name.to_owned(), header_value.trim().to_owned()))
        })
        .collect()
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
