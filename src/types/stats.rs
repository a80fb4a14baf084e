//! Aggregates derived from the explanation store.

use crate::types::{ExplanationRecord, Level};
use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Number of topics reported by [`CacheAnalytics::popular_topics`].
pub const POPULAR_TOPICS_LIMIT: usize = 10;

/// Window covered by [`CacheAnalytics::recent_activity`].
pub const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Record counts, total and per level. Every level is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_cached: u64,
    pub by_level: BTreeMap<Level, u64>,
}

impl CacheStats {
    pub fn empty() -> Self {
        Self {
            total_cached: 0,
            by_level: Level::ALL.iter().map(|l| (*l, 0)).collect(),
        }
    }

    pub fn from_levels(levels: impl IntoIterator<Item = Level>) -> Self {
        let mut stats = Self::empty();
        for level in levels {
            stats.record(level, 1);
        }
        stats
    }

    pub fn record(&mut self, level: Level, count: u64) {
        *self.by_level.entry(level).or_insert(0) += count;
        self.total_cached += count;
    }

    pub fn count(&self, level: Level) -> u64 {
        self.by_level.get(&level).copied().unwrap_or(0)
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    /// Number of levels cached for this topic.
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Store-wide analytics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheAnalytics {
    pub total_explanations: u64,
    pub popular_topics: Vec<TopicCount>,
    pub level_distribution: BTreeMap<Level, u64>,
    /// Per-day record counts for the last week, newest first.
    pub recent_activity: Vec<DailyCount>,
    pub generated_at: DateTime<Utc>,
}

impl CacheAnalytics {
    pub fn from_records(records: &[ExplanationRecord], now: DateTime<Utc>) -> Self {
        let stats = CacheStats::from_levels(records.iter().map(ExplanationRecord::level));

        let mut per_topic: HashMap<&str, u64> = HashMap::new();
        for r in records {
            *per_topic.entry(r.key.topic.as_str()).or_insert(0) += 1;
        }
        let mut popular_topics: Vec<TopicCount> = per_topic
            .into_iter()
            .map(|(topic, count)| TopicCount {
                topic: topic.to_string(),
                count,
            })
            .collect();
        popular_topics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic.cmp(&b.topic)));
        popular_topics.truncate(POPULAR_TOPICS_LIMIT);

        let since = Self::activity_window_start(now);
        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for r in records.iter().filter(|r| r.created_at >= since) {
            *per_day.entry(r.created_at.date_naive()).or_insert(0) += 1;
        }
        let recent_activity = per_day
            .into_iter()
            .rev()
            .map(|(date, count)| DailyCount { date, count })
            .collect();

        Self::from_parts(stats, popular_topics, recent_activity, now)
    }

    /// Assemble from aggregates computed elsewhere, e.g. by a store query.
    pub fn from_parts(
        stats: CacheStats,
        popular_topics: Vec<TopicCount>,
        recent_activity: Vec<DailyCount>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            total_explanations: stats.total_cached,
            popular_topics,
            level_distribution: stats.by_level,
            recent_activity,
            generated_at: now,
        }
    }

    /// Oldest `created_at` counted in `recent_activity`, at store precision.
    pub fn activity_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
        (now - Duration::days(RECENT_ACTIVITY_DAYS)).trunc_subsecs(6)
    }
}

/// Liveness signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;

    fn record(topic: &str, level: Level, created_at: DateTime<Utc>) -> ExplanationRecord {
        ExplanationRecord::new(CacheKey::new(topic, level), topic, "text", false).with_created_at(created_at)
    }

    #[test]
    fn test_stats_zero_fill() {
        let stats = CacheStats::from_levels([Level::Eli5, Level::Eli5, Level::Student]);
        assert_eq!(stats.total_cached, 3);
        assert_eq!(stats.count(Level::Eli5), 2);
        assert_eq!(stats.count(Level::Student), 1);
        assert_eq!(stats.count(Level::Graduate), 0);
        assert_eq!(stats.count(Level::Advanced), 0);
        assert_eq!(stats.by_level.len(), 4);
    }

    #[test]
    fn test_stats_json_shape() {
        let v = serde_json::to_value(CacheStats::from_levels([Level::Graduate])).unwrap();
        assert_eq!(v["total_cached"], 1);
        assert_eq!(v["by_level"]["graduate"], 1);
        assert_eq!(v["by_level"]["eli5"], 0);
    }

    #[test]
    fn test_analytics_from_records() {
        let now = Utc::now();
        let records = vec![
            record("git", Level::Eli5, now),
            record("git", Level::Student, now - Duration::days(1)),
            record("rust", Level::Advanced, now - Duration::days(30)),
        ];
        let a = CacheAnalytics::from_records(&records, now);
        assert_eq!(a.total_explanations, 3);
        assert_eq!(a.popular_topics[0], TopicCount { topic: "git".into(), count: 2 });
        assert_eq!(a.popular_topics[1].topic, "rust");
        assert_eq!(a.level_distribution[&Level::Graduate], 0);
        assert_eq!(a.recent_activity.iter().map(|d| d.count).sum::<u64>(), 2);
        assert!(a.recent_activity.windows(2).all(|w| w[0].date > w[1].date));
    }
}
