//! Shared fixtures: a scripted upstream and a store that always fails.

#![allow(dead_code)]

use async_trait::async_trait;
use concept_simplifier::cache::{CacheKey, ExplanationStore};
use concept_simplifier::error::{StoreError, UpstreamError};
use concept_simplifier::types::{ExplanationRecord, Level, UpstreamResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Upstream that replays queued outcomes and counts calls. When the queue is
/// empty it answers with a complete explanation naming the topic and level.
#[derive(Default)]
pub struct ScriptedUpstream {
    script: Mutex<VecDeque<Result<UpstreamResult, UpstreamError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    seen: Mutex<Vec<(String, Level)>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn then(self, outcome: Result<UpstreamResult, UpstreamError>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, Level)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl concept_simplifier::UpstreamClient for ScriptedUpstream {
    async fn generate(&self, topic: &str, level: Level) -> Result<UpstreamResult, UpstreamError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().unwrap().push((topic.to_string(), level));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(UpstreamResult::complete(format!(
                "explanation #{n} of {topic} for {level}"
            )))
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl ExplanationStore for BrokenStore {
    async fn lookup(&self, _key: &CacheKey) -> concept_simplifier::Result<Option<ExplanationRecord>> {
        Err(StoreError::Corrupt("disk on fire".into()).into())
    }

    async fn put(&self, _record: &ExplanationRecord) -> concept_simplifier::Result<()> {
        Err(StoreError::Corrupt("disk on fire".into()).into())
    }

    async fn scan(&self) -> concept_simplifier::Result<Vec<ExplanationRecord>> {
        Err(StoreError::Corrupt("disk on fire".into()).into())
    }

    async fn ping(&self) -> concept_simplifier::Result<()> {
        Err(StoreError::Corrupt("disk on fire".into()).into())
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Store that never answers within any sane deadline.
pub struct StalledStore;

#[async_trait]
impl ExplanationStore for StalledStore {
    async fn lookup(&self, _key: &CacheKey) -> concept_simplifier::Result<Option<ExplanationRecord>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    async fn put(&self, _record: &ExplanationRecord) -> concept_simplifier::Result<()> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn scan(&self) -> concept_simplifier::Result<Vec<ExplanationRecord>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}
