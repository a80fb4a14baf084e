//! Caller-level retry.
//!
//! The broker never retries inside a call. Callers that want to ride out a
//! transient upstream or store failure wrap the call in a [`RetryPolicy`].
//! Each attempt writes the store only on success, so retries never add
//! writes beyond the normal overwrite.

use crate::{Error, Result};
use std::future::Future;
use tokio::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before the next attempt, or `None` to give up.
    ///
    /// `attempt` is the number of attempts already made.
    pub fn should_retry(&self, attempt: u32, error: &Error) -> Option<Duration> {
        if attempt >= self.max_attempts || !error.is_retryable() {
            return None;
        }
        Some(self.delay)
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => match self.should_retry(attempt, &e) {
                    Some(delay) => {
                        warn!(attempt, max_attempts = self.max_attempts, error = %e, "Retrying after failure");
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorContext, UpstreamError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_retries_generation_errors_up_to_limit() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<()> = fast()
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::from(UpstreamError::Timeout))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_on_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = fast()
            .run(|| async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(Error::from(UpstreamError::Network("refused".into())))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_validation_is_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<()> = fast()
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::validation_with_context("Topic is required", ErrorContext::new()))
            })
            .await;
        assert!(result.unwrap_err().is_validation());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert!(p.delay <= Duration::from_secs(1));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
