//! Cache key derivation.

use super::normalize::normalize;
use crate::types::Level;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of a cached explanation: normalized topic plus level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub topic: String,
    pub level: Level,
}

impl CacheKey {
    /// Build a key from an already-normalized topic.
    pub fn new(normalized_topic: impl Into<String>, level: Level) -> Self {
        Self {
            topic: normalized_topic.into(),
            level,
        }
    }

    /// Normalize `raw_topic` and pair it with `level`.
    pub fn derive(raw_topic: &str, level: Level) -> Self {
        Self::new(normalize(raw_topic), level)
    }

    /// Short stable digest, used to correlate log lines without printing topics.
    ///
    /// Length-prefixed so `("a b", x)` and `("a", "b x")` style splits cannot collide.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.topic.len() as u64).to_le_bytes());
        hasher.update(self.topic.as_bytes());
        hasher.update(self.level.as_str().as_bytes());
        let hash: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
        hash[..12].to_string()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.topic, self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_topics_share_key() {
        let a = CacheKey::derive("  Machine Learning ", Level::Eli5);
        let b = CacheKey::derive("machine learning", Level::Eli5);
        let c = CacheKey::derive("ML", Level::Eli5);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_level_is_part_of_identity() {
        let a = CacheKey::derive("git", Level::Student);
        let b = CacheKey::derive("git", Level::Graduate);
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_short_hex() {
        let fp = CacheKey::derive("rust", Level::Advanced).fingerprint();
        assert_eq!(fp.len(), 12);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
