//! Difficulty levels.

use crate::error::{Error, ErrorContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty level of an explanation. The set is closed: any other value is
/// rejected by [`Level::from_str`] rather than mapped to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Eli5,
    Student,
    Graduate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Eli5, Level::Student, Level::Graduate, Level::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Eli5 => "eli5",
            Level::Student => "student",
            Level::Graduate => "graduate",
            Level::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    /// Parses case-insensitively after trimming surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Level::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Level::ALL.iter().map(Level::as_str).collect();
                Error::validation_with_context(
                    format!("Invalid level. Must be one of: {}", valid.join(", ")),
                    ErrorContext::new()
                        .with_field_path("level")
                        .with_details(format!("got '{}'", s)),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_levels() {
        for level in Level::ALL {
            assert_eq!(level.as_str().parse::<Level>().unwrap(), level);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("ELI5".parse::<Level>().unwrap(), Level::Eli5);
        assert_eq!("  Graduate\t".parse::<Level>().unwrap(), Level::Graduate);
    }

    #[test]
    fn test_unknown_level_is_validation_error() {
        for bad in ["expert", "", "eli 5", "students"] {
            let err = bad.parse::<Level>().unwrap_err();
            assert!(err.is_validation(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Level::Advanced).unwrap(), "\"advanced\"");
        let level: Level = serde_json::from_str("\"eli5\"").unwrap();
        assert_eq!(level, Level::Eli5);
    }
}
