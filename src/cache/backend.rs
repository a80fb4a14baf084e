//! Explanation store abstraction and the in-memory backend.

use super::key::CacheKey;
use crate::error::StoreError;
use crate::types::{CacheAnalytics, CacheStats, ExplanationRecord};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Key/value table of explanations.
///
/// Absence is a normal outcome (`Ok(None)`); any `Err` is a real fault and
/// must never be treated as a miss. Implementations must tolerate concurrent
/// `put`/`lookup` and replace a record as a whole: readers see the old record
/// or the new one, never a mix.
#[async_trait]
pub trait ExplanationStore: Send + Sync {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<ExplanationRecord>>;

    /// Upsert `record` under `record.key`, replacing any previous record.
    async fn put(&self, record: &ExplanationRecord) -> Result<()>;

    /// Every record currently stored, in no particular order.
    async fn scan(&self) -> Result<Vec<ExplanationRecord>>;

    async fn stats(&self) -> Result<CacheStats> {
        let records = self.scan().await?;
        Ok(CacheStats::from_levels(records.iter().map(ExplanationRecord::level)))
    }

    /// Distinct normalized topics, most recently written first.
    async fn recent_topics(&self, limit: usize) -> Result<Vec<String>> {
        let mut records = self.scan().await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut seen = HashSet::new();
        Ok(records
            .into_iter()
            .filter(|r| !r.key.topic.is_empty() && seen.insert(r.key.topic.clone()))
            .map(|r| r.key.topic)
            .take(limit)
            .collect())
    }

    /// Store-wide analytics as of `now`.
    async fn analytics(&self, now: DateTime<Utc>) -> Result<CacheAnalytics> {
        let records = self.scan().await?;
        Ok(CacheAnalytics::from_records(&records, now))
    }

    /// Cheap reachability check.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Process-local store. Not durable; intended for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<CacheKey, ExplanationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.records.read().map_err(|_| StoreError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl ExplanationStore for MemoryStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<ExplanationRecord>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(key).cloned())
    }

    async fn put(&self, record: &ExplanationRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<ExplanationRecord>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.values().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;
    use chrono::{Duration, Utc};

    fn record(topic: &str, level: Level, text: &str) -> ExplanationRecord {
        ExplanationRecord::new(CacheKey::derive(topic, level), topic, text, false)
    }

    #[tokio::test]
    async fn test_lookup_miss_is_none() {
        let store = MemoryStore::new();
        let key = CacheKey::derive("git", Level::Student);
        assert!(store.lookup(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_lookup_returns_equal_record() {
        let store = MemoryStore::new();
        let r = record("Git", Level::Student, "Git tracks changes.");
        store.put(&r).await.unwrap();
        assert_eq!(store.lookup(&r.key).await.unwrap(), Some(r));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryStore::new();
        let first = record("Git", Level::Student, "first");
        let second = record("git", Level::Student, "second");
        store.put(&first).await.unwrap();
        store.put(&second).await.unwrap();
        assert_eq!(store.len().unwrap(), 1);
        let got = store.lookup(&first.key).await.unwrap().unwrap();
        assert_eq!(got.explanation_text, "second");
        assert_eq!(got.original_topic, "git");
    }

    #[tokio::test]
    async fn test_default_stats_scan() {
        let store = MemoryStore::new();
        store.put(&record("a", Level::Eli5, "x")).await.unwrap();
        store.put(&record("b", Level::Eli5, "x")).await.unwrap();
        store.put(&record("c", Level::Student, "x")).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_cached, 3);
        assert_eq!(stats.count(Level::Eli5), 2);
        assert_eq!(stats.count(Level::Student), 1);
        assert_eq!(stats.count(Level::Graduate), 0);
        assert_eq!(stats.count(Level::Advanced), 0);
    }

    #[tokio::test]
    async fn test_recent_topics_distinct_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .put(&record("old", Level::Eli5, "x").with_created_at(now - Duration::hours(2)))
            .await
            .unwrap();
        store
            .put(&record("new", Level::Eli5, "x").with_created_at(now))
            .await
            .unwrap();
        store
            .put(&record("new", Level::Advanced, "x").with_created_at(now - Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(store.recent_topics(10).await.unwrap(), vec!["new", "old"]);
        assert_eq!(store.recent_topics(1).await.unwrap(), vec!["new"]);
    }
}
