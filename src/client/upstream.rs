use crate::config::UpstreamConfig;
use crate::drivers::prompt::build_messages;
use crate::drivers::{OpenAiDriver, ProviderDriver, UpstreamClient, MAX_OUTPUT_TOKENS};
use crate::error::UpstreamError;
use crate::transport::HttpTransport;
use crate::types::{Level, UpstreamResult};
use crate::Result;
use async_trait::async_trait;
use tracing::debug;

/// [`UpstreamClient`] over HTTP: one chat completion per call, bounded by the
/// transport timeout.
pub struct HttpUpstream {
    transport: HttpTransport,
    driver: Box<dyn ProviderDriver>,
    model: String,
    temperature: Option<f64>,
}

impl HttpUpstream {
    /// Build an OpenAI-compatible client. Fails on incomplete configuration,
    /// including a missing API key.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        config.validate()?;
        let provider_id = url::Url::parse(&config.endpoint)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_else(|| "openai-compatible".to_string());
        Ok(Self {
            transport: HttpTransport::new(config)?,
            driver: Box::new(OpenAiDriver::new(provider_id)),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn generate(&self, topic: &str, level: Level) -> std::result::Result<UpstreamResult, UpstreamError> {
        let messages = build_messages(topic, level);
        let request = self
            .driver
            .build_request(&messages, &self.model, self.temperature, MAX_OUTPUT_TOKENS);
        debug!(
            provider = self.driver.provider_id(),
            model = %self.model,
            level = %level,
            timeout_ms = self.transport.timeout().as_millis() as u64,
            "Requesting explanation"
        );
        let body = self.transport.execute_json(&request).await?;
        self.driver.parse_response(&body)
    }

    fn name(&self) -> &str {
        self.driver.provider_id()
    }
}
