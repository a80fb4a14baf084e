use crate::cache::{CacheKey, ExplanationStore};
use crate::client::retry::RetryPolicy;
use crate::config::BrokerConfig;
use crate::drivers::UpstreamClient;
use crate::error::{Error, ErrorContext, StoreError, UpstreamError};
use crate::types::{
    CacheAnalytics, CacheStats, Explanation, ExplanationRecord, FinishReason, HealthStatus, Level,
    UpstreamResult,
};
use crate::Result;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of topics returned by [`Broker::suggestions`].
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// Turns `(topic, level)` requests into explanations, from the store when
/// possible and from one upstream call otherwise.
///
/// Holds no per-request state: concurrent calls for different keys proceed
/// independently, and the store is the only shared mutable resource.
/// Two concurrent misses on the same key may both call upstream; the last
/// write wins.
pub struct Broker {
    store: Arc<dyn ExplanationStore>,
    upstream: Arc<dyn UpstreamClient>,
    config: BrokerConfig,
}

impl Broker {
    pub fn new(
        store: Arc<dyn ExplanationStore>,
        upstream: Arc<dyn UpstreamClient>,
        config: BrokerConfig,
    ) -> Self {
        Self {
            store,
            upstream,
            config,
        }
    }

    pub fn builder() -> crate::client::BrokerBuilder {
        crate::client::BrokerBuilder::new()
    }

    /// Explain `topic` at `level`.
    ///
    /// Invalid input fails before the store or the network is touched. With
    /// `force_regenerate` the cache read is skipped and the fresh result
    /// overwrites whatever was stored for the key.
    ///
    /// A write that outlives the store timeout is reported as
    /// [`StoreError::Timeout`], but a backend that already handed the write to
    /// another thread (such as [`SqliteStore`](crate::cache::SqliteStore)) may
    /// still commit it. A later call for the same key can then be a cache hit.
    pub async fn explain(&self, topic: &str, level: &str, force_regenerate: bool) -> Result<Explanation> {
        let level: Level = level.parse()?;
        let topic = validate_topic(topic)?;
        let key = CacheKey::derive(topic, level);
        if key.topic.is_empty() {
            return Err(Error::validation_with_context(
                "Topic has no content",
                ErrorContext::new()
                    .with_field_path("topic")
                    .with_details(format!("'{}' normalizes to an empty string", topic)),
            ));
        }

        if !force_regenerate {
            if let Some(record) = bounded(self.config.store_timeout, self.store.lookup(&key)).await? {
                debug!(key = %key.fingerprint(), level = %level, "Cache hit");
                return Ok(Explanation::from_record(topic, &record, true, false));
            }
            debug!(key = %key.fingerprint(), level = %level, "Cache miss");
        }

        let record = self.generate_and_store(key, topic.to_string()).await?;
        Ok(Explanation::from_record(topic, &record, false, force_regenerate))
    }

    /// Bypass the cache read, call upstream and overwrite the stored record.
    pub async fn regenerate(&self, topic: &str, level: &str) -> Result<Explanation> {
        self.explain(topic, level, true).await
    }

    /// [`Broker::explain`] under a caller-level retry policy.
    pub async fn explain_with_retry(
        &self,
        topic: &str,
        level: &str,
        force_regenerate: bool,
        policy: &RetryPolicy,
    ) -> Result<Explanation> {
        policy
            .run(|| self.explain(topic, level, force_regenerate))
            .await
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        bounded(self.config.store_timeout, self.store.stats()).await
    }

    /// Distinct cached topics, most recent first.
    pub async fn suggestions(&self, limit: usize) -> Result<Vec<String>> {
        bounded(self.config.store_timeout, self.store.recent_topics(limit)).await
    }

    pub async fn analytics(&self) -> Result<CacheAnalytics> {
        bounded(self.config.store_timeout, self.store.analytics(Utc::now())).await
    }

    /// Healthy when the store answers.
    pub async fn health(&self) -> Result<HealthStatus> {
        bounded(self.config.store_timeout, self.store.ping()).await?;
        Ok(HealthStatus::healthy())
    }

    /// Call upstream and write the result through.
    ///
    /// Runs as its own task so that a caller dropping the request future does
    /// not abandon the write.
    async fn generate_and_store(&self, key: CacheKey, original_topic: String) -> Result<ExplanationRecord> {
        let store = Arc::clone(&self.store);
        let upstream = Arc::clone(&self.upstream);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            let fingerprint = key.fingerprint();
            let generated =
                tokio::time::timeout(config.upstream_timeout, upstream.generate(&original_topic, key.level))
                    .await
                    .map_err(|_| UpstreamError::Timeout)
                    .and_then(|r| r);
            let result = match generated {
                Ok(result) => result,
                Err(e) => {
                    warn!(key = %fingerprint, upstream = upstream.name(), error = %e, "Generation failed");
                    return Err(Error::from(e));
                }
            };

            let record = build_record(key, original_topic, result)?;
            if record.truncated {
                warn!(key = %fingerprint, "Explanation hit the length ceiling");
            }
            bounded(config.store_timeout, store.put(&record)).await?;
            info!(key = %fingerprint, level = %record.level(), truncated = record.truncated, "Stored fresh explanation");
            Ok::<_, Error>(record)
        });

        task.await.map_err(|e| {
            Error::runtime_with_context(
                "generation task failed",
                ErrorContext::new()
                    .with_source("broker")
                    .with_details(e.to_string()),
            )
        })?
    }
}

fn validate_topic(topic: &str) -> Result<&str> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(Error::validation_with_context(
            "Topic is required",
            ErrorContext::new().with_field_path("topic"),
        ));
    }
    Ok(trimmed)
}

fn build_record(key: CacheKey, original_topic: String, result: UpstreamResult) -> Result<ExplanationRecord> {
    if result.finish_reason == FinishReason::Error {
        return Err(UpstreamError::Provider("generation stopped with an error".into()).into());
    }
    if result.text.trim().is_empty() {
        return Err(UpstreamError::MalformedResponse("empty completion".into()).into());
    }
    Ok(ExplanationRecord::from_upstream(key, original_topic, result))
}

/// Run a store operation under a deadline.
async fn bounded<T>(limit: Duration, op: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, op).await {
        Ok(outcome) => outcome,
        Err(_) => Err(StoreError::Timeout(limit).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_topic_trims() {
        assert_eq!(validate_topic("  Git \n").unwrap(), "Git");
        assert!(validate_topic("   ").unwrap_err().is_validation());
        assert!(validate_topic("").unwrap_err().is_validation());
    }

    #[test]
    fn test_build_record_rejects_error_and_empty() {
        let key = CacheKey::derive("git", Level::Student);
        let err = build_record(key.clone(), "Git".into(), UpstreamResult::new("partial", FinishReason::Error))
            .unwrap_err();
        assert!(matches!(err, Error::Generation(UpstreamError::Provider(_))));

        let err = build_record(key.clone(), "Git".into(), UpstreamResult::complete("  ")).unwrap_err();
        assert!(matches!(err, Error::Generation(UpstreamError::MalformedResponse(_))));

        let record = build_record(key, "Git".into(), UpstreamResult::new("Git is", FinishReason::Length)).unwrap();
        assert!(record.truncated);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, Error>(())
        };
        let err = bounded(Duration::from_millis(10), slow).await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Timeout(_))));
        assert!(err.is_retryable());
    }
}
