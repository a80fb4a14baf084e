//! OpenAI 兼容驱动：chat completions 请求构建与响应解析
//!
//! OpenAI-compatible chat completions driver. Covers OpenRouter, OpenAI,
//! DeepSeek and anything else that answers with
//! `choices[0].message.content` and `choices[0].finish_reason`.

use serde_json::Value;

use crate::error::UpstreamError;
use crate::types::{Message, UpstreamResult};

use super::{classify_finish_reason, DriverRequest, ProviderDriver};

#[derive(Debug)]
pub struct OpenAiDriver {
    provider_id: String,
}

impl OpenAiDriver {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }
}

impl ProviderDriver for OpenAiDriver {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn build_request(
        &self,
        messages: &[Message],
        model: &str,
        temperature: Option<f64>,
        max_tokens: u32,
    ) -> DriverRequest {
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "max_tokens": max_tokens,
            "stream": false,
        });
        if let Some(t) = temperature {
            body["temperature"] = serde_json::json!(t);
        }

        DriverRequest { body }
    }

    fn parse_response(&self, body: &Value) -> Result<UpstreamResult, UpstreamError> {
        // Some gateways answer 200 with an error envelope instead of choices.
        if let Some(err) = body.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| err.to_string());
            return Err(UpstreamError::Provider(message));
        }

        let choice = body
            .pointer("/choices/0")
            .ok_or_else(|| UpstreamError::MalformedResponse("missing choices[0]".into()))?;
        let text = choice
            .pointer("/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                UpstreamError::MalformedResponse("missing choices[0].message.content".into())
            })?;
        let finish_reason = classify_finish_reason(choice.get("finish_reason").and_then(Value::as_str));
        Ok(UpstreamResult::new(text, finish_reason))
    }
}
