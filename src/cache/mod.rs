//! 缓存模块：主题规范化、缓存键与可插拔的解释存储。
//!
//! # Explanation Cache Module
//!
//! Everything between a raw `(topic, level)` request and a persisted
//! explanation: key derivation and the store behind it.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`normalize()`] | Canonicalizes a raw topic string |
//! | [`CacheKey`] | Normalized topic + level |
//! | [`ExplanationStore`] | Trait for store backends |
//! | [`SqliteStore`] | Durable SQLite backend |
//! | [`MemoryStore`] | In-process backend for tests |
//!
//! ## Example
//!
//! ```rust
//! use concept_simplifier::cache::{normalize, CacheKey};
//! use concept_simplifier::types::Level;
//!
//! assert_eq!(normalize("  What is AI? "), "artificial intelligence");
//! assert_eq!(
//!     CacheKey::derive("  Machine Learning ", Level::Eli5),
//!     CacheKey::derive("ML", Level::Eli5),
//! );
//! ```

mod backend;
mod key;
mod normalize;
mod sqlite;

pub use backend::{ExplanationStore, MemoryStore};
pub use key::CacheKey;
pub use normalize::normalize;
pub use sqlite::SqliteStore;
