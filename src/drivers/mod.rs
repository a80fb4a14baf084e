//! Provider 驱动抽象层：上游调用契约与响应解析
//!
//! Upstream generation contract and provider wire adaptation.
//!
//! [`UpstreamClient`] is what the broker talks to: one call, one result,
//! no retries. [`ProviderDriver`] is the wire half of an HTTP implementation:
//! it builds the provider request and turns the provider envelope into an
//! [`UpstreamResult`], translating the provider's stop string into the closed
//! [`FinishReason`] enum so nothing above this layer inspects provider strings.

pub mod openai;
pub mod prompt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::types::{FinishReason, Level, Message, UpstreamResult};

pub use openai::OpenAiDriver;
pub use prompt::MAX_OUTPUT_TOKENS;

/// Single-shot explanation generator.
///
/// Implementations hold no shared mutable state and may be called
/// concurrently. They must not retry internally.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn generate(&self, topic: &str, level: Level) -> Result<UpstreamResult, UpstreamError>;

    fn name(&self) -> &str {
        "upstream"
    }
}

/// Provider request body, sent as a JSON POST by the transport.
#[derive(Debug, Clone)]
pub struct DriverRequest {
    pub body: Value,
}

pub trait ProviderDriver: Send + Sync + std::fmt::Debug {
    fn provider_id(&self) -> &str;

    fn build_request(
        &self,
        messages: &[Message],
        model: &str,
        temperature: Option<f64>,
        max_tokens: u32,
    ) -> DriverRequest;

    /// Parse a successful (2xx) response body.
    fn parse_response(&self, body: &Value) -> Result<UpstreamResult, UpstreamError>;
}

/// Map a provider stop string onto [`FinishReason`].
///
/// Every spelling of "hit the output ceiling" becomes `Length`; an explicit
/// error becomes `Error`; anything else, including a missing value, is a
/// normal completion.
pub fn classify_finish_reason(raw: Option<&str>) -> FinishReason {
    let Some(raw) = raw else {
        return FinishReason::Complete;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "length" | "max_tokens" | "max_output_tokens" | "model_length" => FinishReason::Length,
        "error" => FinishReason::Error,
        _ => FinishReason::Complete,
    }
}
