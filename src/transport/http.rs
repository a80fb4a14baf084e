use crate::config::UpstreamConfig;
use crate::drivers::DriverRequest;
use crate::error::{Error, ErrorContext, UpstreamError};
use crate::Result;
use reqwest::Proxy;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Longest provider error body echoed back in an error message.
const MAX_ERROR_BODY: usize = 512;

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    "invalid proxy URL",
                    ErrorContext::new()
                        .with_field_path("CONCEPT_PROXY_URL")
                        .with_details(e.to_string()),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                "failed to build HTTP client",
                ErrorContext::new()
                    .with_source("http_transport")
                    .with_details(e.to_string()),
            )
        })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request` and return the decoded JSON body of a 2xx response.
    pub async fn execute_json(&self, request: &DriverRequest) -> std::result::Result<Value, UpstreamError> {
        let mut req = self.client.post(&self.endpoint).json(&request.body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        debug!(status = status.as_u16(), "Upstream responded");

        let bytes = response.bytes().await.map_err(classify_reqwest_error)?;
        if !status.is_success() {
            let mut message = String::from_utf8_lossy(&bytes).into_owned();
            if message.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| message.is_char_boundary(*i))
                    .unwrap_or(0);
                message.truncate(cut);
            }
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| UpstreamError::MalformedResponse(format!("invalid JSON body: {}", e)))
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else if let Some(status) = e.status() {
        UpstreamError::Http {
            status: status.as_u16(),
            message: e.to_string(),
        }
    } else if e.is_decode() {
        UpstreamError::MalformedResponse(e.to_string())
    } else {
        UpstreamError::Network(e.to_string())
    }
}
