//! SQLite store durability and the broker running on top of it.

mod common;

use common::ScriptedUpstream;
use concept_simplifier::cache::{CacheKey, ExplanationStore, SqliteStore};
use concept_simplifier::error::StoreError;
use concept_simplifier::types::{ExplanationRecord, FinishReason, Level, UpstreamResult};
use concept_simplifier::{Broker, BrokerConfig, Error};
use std::sync::Arc;
use std::time::Duration;

const BUSY: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("explanations.db");

    let key = CacheKey::derive("Git", Level::Student);
    let record = ExplanationRecord::new(key.clone(), "Git", "Git tracks changes.", true);
    {
        let store = SqliteStore::open(&path, BUSY).unwrap();
        store.put(&record).await.unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
    }

    let reopened = SqliteStore::open(&path, BUSY).unwrap();
    let loaded = reopened.lookup(&key).await.unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[tokio::test]
async fn test_put_overwrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("db.sqlite"), BUSY).unwrap();
    let key = CacheKey::derive("Rust", Level::Graduate);

    store
        .put(&ExplanationRecord::new(key.clone(), "Rust", "old", false))
        .await
        .unwrap();
    let newer = ExplanationRecord::new(key.clone(), "rust", "new", true);
    store.put(&newer).await.unwrap();

    assert_eq!(store.lookup(&key).await.unwrap().unwrap(), newer);
    assert_eq!(store.scan().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_broker_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("explanations.db");
    let upstream = Arc::new(
        ScriptedUpstream::new().then(Ok(UpstreamResult::new("A neural", FinishReason::Length))),
    );

    {
        let broker = Broker::builder()
            .store(Arc::new(SqliteStore::open(&path, BUSY).unwrap()))
            .upstream(upstream.clone())
            .build()
            .unwrap();
        let first = broker.explain("Neural Networks", "eli5", false).await.unwrap();
        assert!(!first.cached);
        assert!(first.truncated);
    }

    // A fresh broker on the same file serves the stored record.
    let broker = Broker::builder()
        .store(Arc::new(SqliteStore::open(&path, BUSY).unwrap()))
        .upstream(upstream.clone())
        .build()
        .unwrap();
    let again = broker.explain("neural networks?", "eli5", false).await.unwrap();
    assert!(again.cached);
    assert!(again.truncated);
    assert_eq!(upstream.calls(), 1);

    let stats = broker.stats().await.unwrap();
    assert_eq!(stats.total_cached, 1);
    assert_eq!(stats.count(Level::Eli5), 1);
    broker.health().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_writers_share_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("db.sqlite"), BUSY).unwrap());

    let writes = (0..16).map(|i| {
        let store = store.clone();
        async move {
            let level = Level::ALL[i % Level::ALL.len()];
            let key = CacheKey::derive(&format!("topic {}", i / 4), level);
            store
                .put(&ExplanationRecord::new(key, format!("Topic {i}"), format!("text {i}"), false))
                .await
        }
    });
    for result in futures::future::join_all(writes).await {
        result.unwrap();
    }

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_cached, 16);
    for level in Level::ALL {
        assert_eq!(stats.count(level), 4);
    }
}

#[tokio::test]
async fn test_write_timeout_may_still_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("explanations.db");
    let store = Arc::new(SqliteStore::open(&path, Duration::from_secs(5)).unwrap());
    let upstream = Arc::new(ScriptedUpstream::new());
    let broker = Broker::builder()
        .store(store.clone())
        .upstream(upstream.clone())
        .config(BrokerConfig::default().with_store_timeout(Duration::from_millis(100)))
        .build()
        .unwrap();

    // Another process holds the write lock on the file.
    let blocker = rusqlite::Connection::open(&path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

    let err = broker.explain("Git", "student", false).await.unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Timeout(_))));
    assert!(err.is_retryable());

    blocker.execute_batch("ROLLBACK").unwrap();

    // The write was already queued on the connection and lands once the lock is free.
    let key = CacheKey::derive("Git", Level::Student);
    let mut stored = None;
    for _ in 0..50 {
        stored = store.lookup(&key).await.unwrap();
        if stored.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(stored.is_some());

    let again = broker.explain("git", "student", false).await.unwrap();
    assert!(again.cached);
    assert_eq!(upstream.calls(), 1);
}
