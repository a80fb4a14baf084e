//! 配置模块：上游、存储与代理超时的环境变量配置。
//!
//! Runtime configuration. Every knob has a default and can be overridden from
//! the environment; nothing here reads files (the binary loads `.env` first).
//!
//! | Variable | Default |
//! |----------|---------|
//! | `OPENROUTER_API_KEY` | unset |
//! | `CONCEPT_UPSTREAM_URL` | [`DEFAULT_UPSTREAM_URL`] |
//! | `CONCEPT_MODEL` | [`DEFAULT_MODEL`] |
//! | `CONCEPT_TEMPERATURE` | `0.7` |
//! | `CONCEPT_HTTP_TIMEOUT_SECS` | `30` |
//! | `CONCEPT_PROXY_URL` | unset |
//! | `CONCEPT_DATABASE_PATH` | `explanations.db` |
//! | `CONCEPT_STORE_TIMEOUT_MS` | `5000` |

use crate::error::{Error, ErrorContext};
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.2-3b-instruct:free";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DATABASE_PATH: &str = "explanations.db";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Slack added on top of the HTTP timeout for the broker's outer guard.
const UPSTREAM_GRACE: Duration = Duration::from_secs(5);

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Upstream provider settings.
#[derive(Clone)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f64>,
    /// Hard timeout on the whole HTTP exchange.
    pub timeout: Duration,
    pub proxy_url: Option<String>,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("proxy_url", &self.proxy_url)
            .finish()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_UPSTREAM_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            proxy_url: None,
        }
    }
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env_string("CONCEPT_UPSTREAM_URL").unwrap_or(defaults.endpoint),
            api_key: env_string("OPENROUTER_API_KEY"),
            model: env_string("CONCEPT_MODEL").unwrap_or(defaults.model),
            temperature: env_parse::<f64>("CONCEPT_TEMPERATURE").or(defaults.temperature),
            timeout: env_parse::<u64>("CONCEPT_HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            proxy_url: env_string("CONCEPT_PROXY_URL"),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint).map_err(|e| {
            Error::configuration_with_context(
                "upstream endpoint is not a valid URL",
                ErrorContext::new()
                    .with_field_path("CONCEPT_UPSTREAM_URL")
                    .with_details(e.to_string()),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                "upstream endpoint must be http or https",
                ErrorContext::new()
                    .with_field_path("CONCEPT_UPSTREAM_URL")
                    .with_details(format!("scheme '{}'", url.scheme())),
            ));
        }
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(Error::configuration_with_context(
                "upstream API key not configured",
                ErrorContext::new().with_field_path("OPENROUTER_API_KEY"),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "upstream timeout must be positive",
                ErrorContext::new().with_field_path("CONCEPT_HTTP_TIMEOUT_SECS"),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::configuration_with_context(
                    "temperature out of range",
                    ErrorContext::new()
                        .with_field_path("CONCEPT_TEMPERATURE")
                        .with_details(format!("{t} not in [0, 2]")),
                ));
            }
        }
        Ok(())
    }
}

/// Persistent store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    /// Bound on each store operation; also the SQLite busy timeout.
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_path: env_string("CONCEPT_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            timeout: env_parse::<u64>("CONCEPT_STORE_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// Timeouts the broker applies around its two suspension points.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub store_timeout: Duration,
    pub upstream_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            upstream_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS) + UPSTREAM_GRACE,
        }
    }
}

impl BrokerConfig {
    /// Derive broker guards from the store and upstream settings.
    pub fn from_parts(store: &StoreConfig, upstream: &UpstreamConfig) -> Self {
        Self {
            store_timeout: store.timeout,
            upstream_timeout: upstream.timeout + UPSTREAM_GRACE,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}
