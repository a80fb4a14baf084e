//! Durable SQLite backend.
//!
//! One table keyed by `(normalized_topic, level)`. Writes are a single
//! `INSERT .. ON CONFLICT DO UPDATE`, so a record is replaced atomically.
//! All statements run on the blocking pool. Writes go through a single
//! mutex-guarded writer connection. A file-backed store also keeps a small
//! pool of read-only connections, so under WAL a lookup never queues behind
//! a write. An in-memory store has one connection for both. The busy timeout
//! bounds lock waits on the file.

use super::backend::ExplanationStore;
use super::key::CacheKey;
use crate::error::StoreError;
use crate::types::{CacheAnalytics, CacheStats, DailyCount, ExplanationRecord, Level, TopicCount};
use crate::types::stats::POPULAR_TOPICS_LIMIT;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS explanations (
    normalized_topic TEXT NOT NULL,
    level            TEXT NOT NULL,
    original_topic   TEXT NOT NULL,
    explanation      TEXT NOT NULL,
    truncated        INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    PRIMARY KEY (normalized_topic, level)
)";

/// Read-only connections opened next to the writer for a file-backed store.
const READ_CONNECTIONS: usize = 4;

const SELECT_COLUMNS: &str =
    "SELECT normalized_topic, level, original_topic, explanation, truncated, created_at FROM explanations";

pub struct SqliteStore {
    writer: Arc<Mutex<Connection>>,
    readers: Arc<Vec<Mutex<Connection>>>,
    next_reader: AtomicUsize,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("readers", &self.readers.len())
            .finish()
    }
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::from)?;
        }
        let conn = Connection::open(path).map_err(StoreError::from)?;
        conn.busy_timeout(busy_timeout).map_err(StoreError::from)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
            .map_err(StoreError::from)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(StoreError::from)?;
        conn.execute_batch(SCHEMA).map_err(StoreError::from)?;

        let mut readers = Vec::with_capacity(READ_CONNECTIONS);
        for _ in 0..READ_CONNECTIONS {
            let reader = Connection::open(path).map_err(StoreError::from)?;
            reader.busy_timeout(busy_timeout).map_err(StoreError::from)?;
            reader
                .pragma_update(None, "query_only", true)
                .map_err(StoreError::from)?;
            readers.push(Mutex::new(reader));
        }
        debug!(path = %path.display(), readers = readers.len(), "Opened explanation store");
        Ok(Self {
            writer: Arc::new(Mutex::new(conn)),
            readers: Arc::new(readers),
            next_reader: AtomicUsize::new(0),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database with the same schema.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        conn.execute_batch(SCHEMA).map_err(StoreError::from)?;
        Ok(Self {
            writer: Arc::new(Mutex::new(conn)),
            readers: Arc::new(Vec::new()),
            next_reader: AtomicUsize::new(0),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn with_writer<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.writer);
        run_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await
    }

    /// Run `f` on the next pooled reader, or on the writer when there is no pool.
    async fn with_reader<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        if self.readers.is_empty() {
            return self.with_writer(f).await;
        }
        let readers = Arc::clone(&self.readers);
        let idx = self.next_reader.fetch_add(1, Ordering::Relaxed) % readers.len();
        run_blocking(move || {
            let guard = readers[idx].lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?;
    Ok(outcome?)
}

/// Row as stored, before the level and timestamp are decoded.
struct RawRow {
    topic: String,
    level: String,
    original_topic: String,
    explanation: String,
    truncated: bool,
    created_at: String,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            topic: row.get(0)?,
            level: row.get(1)?,
            original_topic: row.get(2)?,
            explanation: row.get(3)?,
            truncated: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn decode(self) -> std::result::Result<ExplanationRecord, StoreError> {
        let level = decode_level(&self.level)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::Corrupt(format!("created_at '{}': {}", self.created_at, e)))?
            .with_timezone(&Utc);
        Ok(ExplanationRecord {
            key: CacheKey::new(self.topic, level),
            original_topic: self.original_topic,
            explanation_text: self.explanation,
            truncated: self.truncated,
            created_at,
        })
    }
}

fn decode_level(raw: &str) -> std::result::Result<Level, StoreError> {
    raw.parse::<Level>()
        .map_err(|_| StoreError::Corrupt(format!("unknown level '{}'", raw)))
}

fn query_stats(conn: &Connection) -> std::result::Result<CacheStats, StoreError> {
    let mut stmt = conn.prepare("SELECT level, COUNT(*) FROM explanations GROUP BY level")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    let mut stats = CacheStats::empty();
    for row in rows {
        let (level, count) = row?;
        stats.record(decode_level(&level)?, count.max(0) as u64);
    }
    Ok(stats)
}

fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl ExplanationStore for SqliteStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<ExplanationRecord>> {
        let topic = key.topic.clone();
        let level = key.level.as_str();
        self.with_reader(move |conn| {
            let raw = conn
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE normalized_topic = ?1 AND level = ?2"),
                    params![topic, level],
                    RawRow::read,
                )
                .optional()?;
            raw.map(RawRow::decode).transpose()
        })
        .await
    }

    async fn put(&self, record: &ExplanationRecord) -> Result<()> {
        let record = record.clone();
        self.with_writer(move |conn| {
            conn.execute(
                "INSERT INTO explanations
                 (normalized_topic, level, original_topic, explanation, truncated, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (normalized_topic, level) DO UPDATE SET
                    original_topic = excluded.original_topic,
                    explanation    = excluded.explanation,
                    truncated      = excluded.truncated,
                    created_at     = excluded.created_at",
                params![
                    record.key.topic,
                    record.key.level.as_str(),
                    record.original_topic,
                    record.explanation_text,
                    record.truncated,
                    encode_timestamp(&record.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn scan(&self) -> Result<Vec<ExplanationRecord>> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(SELECT_COLUMNS)?;
            let rows = stmt.query_map([], RawRow::read)?;
            let mut out = Vec::new();
            for raw in rows {
                out.push(raw?.decode()?);
            }
            Ok(out)
        })
        .await
    }

    async fn stats(&self) -> Result<CacheStats> {
        self.with_reader(query_stats).await
    }

    async fn recent_topics(&self, limit: usize) -> Result<Vec<String>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_reader(move |conn| {
            // created_at is fixed-width RFC 3339 UTC, so text order is time order
            let mut stmt = conn.prepare(
                "SELECT normalized_topic, MAX(created_at) AS latest
                 FROM explanations
                 WHERE normalized_topic != ''
                 GROUP BY normalized_topic
                 ORDER BY latest DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for topic in rows {
                out.push(topic?);
            }
            Ok(out)
        })
        .await
    }

    async fn analytics(&self, now: DateTime<Utc>) -> Result<CacheAnalytics> {
        let since = encode_timestamp(&CacheAnalytics::activity_window_start(now));
        self.with_reader(move |conn| {
            let stats = query_stats(conn)?;

            let mut stmt = conn.prepare(
                "SELECT normalized_topic, COUNT(*) AS n
                 FROM explanations
                 GROUP BY normalized_topic
                 ORDER BY n DESC, normalized_topic ASC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![POPULAR_TOPICS_LIMIT as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut popular_topics = Vec::new();
            for row in rows {
                let (topic, count) = row?;
                popular_topics.push(TopicCount {
                    topic,
                    count: count.max(0) as u64,
                });
            }

            // first ten characters of the stored timestamp are the UTC date
            let mut stmt = conn.prepare(
                "SELECT substr(created_at, 1, 10) AS day, COUNT(*)
                 FROM explanations
                 WHERE created_at >= ?1
                 GROUP BY day
                 ORDER BY day DESC",
            )?;
            let rows = stmt.query_map(params![since], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut recent_activity = Vec::new();
            for row in rows {
                let (day, count) = row?;
                let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .map_err(|e| StoreError::Corrupt(format!("created_at day '{}': {}", day, e)))?;
                recent_activity.push(DailyCount {
                    date,
                    count: count.max(0) as u64,
                });
            }

            Ok(CacheAnalytics::from_parts(stats, popular_topics, recent_activity, now))
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.with_reader(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
