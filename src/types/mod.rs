//! 类型系统模块：定义解释代理的核心数据类型。
//!
//! # Types Module
//!
//! Strongly-typed values that flow between the broker, the store and the
//! upstream client.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Level`] | Closed set of difficulty levels |
//! | [`ExplanationRecord`] | Persisted explanation, owned by the store |
//! | [`Explanation`] | Broker response handed to the caller |
//! | [`UpstreamResult`] | Transient result of one upstream call |
//! | [`FinishReason`] | Provider stop signal, normalized |
//! | [`CacheStats`] / [`CacheAnalytics`] | Aggregates derived from the store |
//!
//! ## Example
//!
//! ```rust
//! use concept_simplifier::types::Level;
//!
//! let level: Level = " Student ".parse().unwrap();
//! assert_eq!(level, Level::Student);
//! assert!("expert".parse::<Level>().is_err());
//! ```

pub mod explanation;
pub mod level;
pub mod message;
pub mod stats;

pub use explanation::{Explanation, ExplanationRecord, FinishReason, UpstreamResult, TRUNCATION_NOTICE};
pub use level::Level;
pub use message::{Message, MessageRole};
pub use stats::{CacheAnalytics, CacheStats, DailyCount, HealthStatus, TopicCount};
