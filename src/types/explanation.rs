//! Explanation records, broker responses and upstream results.

use crate::cache::CacheKey;
use crate::types::Level;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Advisory appended to an explanation cut short by the output-length ceiling.
pub const TRUNCATION_NOTICE: &str = "\n\n*[Note: This explanation was truncated due to length limits. \
Try asking for a more specific aspect of this topic for a complete answer.]*";

/// Why the provider stopped generating, normalized at the driver boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Complete,
    /// Generation hit the output-length ceiling.
    Length,
    Error,
}

/// Result of one upstream generation call. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResult {
    pub text: String,
    pub finish_reason: FinishReason,
}

impl UpstreamResult {
    pub fn new(text: impl Into<String>, finish_reason: FinishReason) -> Self {
        Self {
            text: text.into(),
            finish_reason,
        }
    }

    pub fn complete(text: impl Into<String>) -> Self {
        Self::new(text, FinishReason::Complete)
    }

    pub fn truncated(&self) -> bool {
        self.finish_reason == FinishReason::Length
    }
}

/// A cached explanation. Immutable once written; regeneration replaces the
/// whole record under the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationRecord {
    pub key: CacheKey,
    /// Topic as first submitted, trimmed.
    pub original_topic: String,
    /// Raw generated text, without the truncation notice.
    pub explanation_text: String,
    pub truncated: bool,
    pub created_at: DateTime<Utc>,
}

impl ExplanationRecord {
    pub fn new(
        key: CacheKey,
        original_topic: impl Into<String>,
        explanation_text: impl Into<String>,
        truncated: bool,
    ) -> Self {
        Self {
            key,
            original_topic: original_topic.into(),
            explanation_text: explanation_text.into(),
            truncated,
            // Store precision is microseconds.
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    pub fn from_upstream(key: CacheKey, original_topic: impl Into<String>, result: UpstreamResult) -> Self {
        let truncated = result.truncated();
        Self::new(key, original_topic, result.text, truncated)
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at.trunc_subsecs(6);
        self
    }

    pub fn level(&self) -> Level {
        self.key.level
    }

    /// Text as shown to callers: the stored text plus the notice when truncated.
    pub fn display_text(&self) -> String {
        if self.truncated {
            format!("{}{}", self.explanation_text, TRUNCATION_NOTICE)
        } else {
            self.explanation_text.clone()
        }
    }
}

/// Broker response for one `explain` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub topic: String,
    pub level: Level,
    pub explanation: String,
    pub cached: bool,
    pub regenerated: bool,
    pub truncated: bool,
}

impl Explanation {
    pub(crate) fn from_record(topic: &str, record: &ExplanationRecord, cached: bool, regenerated: bool) -> Self {
        Self {
            topic: topic.to_string(),
            level: record.level(),
            explanation: record.display_text(),
            cached,
            regenerated,
            truncated: record.truncated,
        }
    }
}
