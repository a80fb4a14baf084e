//! # concept-simplifier
//!
//! 概念解释缓存代理：按 (主题, 难度) 归一化缓存，未命中时调用上游模型生成。
//!
//! An explanation broker. A request names a topic and an audience level; the
//! broker normalizes the pair into a cache key, serves a stored explanation
//! when one exists, and otherwise asks an upstream language model once,
//! stores the result and returns it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use concept_simplifier::Broker;
//!
//! #[tokio::main]
//! async fn main() -> concept_simplifier::Result<()> {
//!     let broker = Broker::builder().from_env()?.build()?;
//!
//!     let first = broker.explain("What is Machine Learning?", "eli5", false).await?;
//!     let again = broker.explain("machine learning", "eli5", false).await?;
//!     assert!(!first.cached);
//!     assert!(again.cached);
//!
//!     let stats = broker.stats().await?;
//!     println!("{} cached explanations", stats.total_cached);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Key normalization and explanation stores (memory, SQLite) |
//! | [`client`] | The broker, its builder, retry policy and HTTP upstream |
//! | [`drivers`] | Upstream contract, prompts and provider wire format |
//! | [`transport`] | HTTP transport |
//! | [`config`] | Environment-driven configuration |
//! | [`types`] | Levels, records, explanations and statistics |

pub mod cache;
pub mod client;
pub mod config;
pub mod drivers;
pub mod transport;
pub mod types;

pub use cache::{normalize, CacheKey, ExplanationStore, MemoryStore, SqliteStore};
pub use client::{Broker, BrokerBuilder, HttpUpstream, RetryPolicy};
pub use config::{BrokerConfig, StoreConfig, UpstreamConfig};
pub use drivers::UpstreamClient;
pub use types::{
    CacheAnalytics, CacheStats, Explanation, ExplanationRecord, FinishReason, HealthStatus, Level,
    UpstreamResult,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, StoreError, UpstreamError};
