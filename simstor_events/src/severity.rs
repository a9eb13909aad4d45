//! Event severity.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The five severities an event may carry, ordered by importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// High volume, low interest
    Debug,
    /// Routine cluster activity
    Info,
    /// Degradation that does not yet lose data
    Warning,
    /// A failed operation
    Error,
    /// Hardware loss or data at risk
    Critical,
}

impl Severity {
    /// Every severity, least to most important.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// The upper-case label used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownSeverity(s.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::Severity;

    #[test]
    fn severities_are_ordered_by_importance() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("CRITICAL".parse::<Severity>(), Ok(Severity::Critical));
        assert!("WARN".parse::<Severity>().is_err());
    }

    #[test]
    fn serializes_as_upper_case_label() {
        let encoded = serde_json::to_string(&Severity::Critical).expect("failed to serialize");
        assert_eq!(encoded, "\"CRITICAL\"");
        let decoded: Severity = serde_json::from_str("\"DEBUG\"").expect("failed to deserialize");
        assert_eq!(decoded, Severity::Debug);
    }
}
