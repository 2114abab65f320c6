//! Expansion window for unbounded recurrence rules.

use chrono::{DateTime, Duration, Utc};

use crate::constants::{DEFAULT_HORIZON_DAYS, DEFAULT_LOOKBACK_DAYS, DEFAULT_MAX_OCCURRENCES};

/// Cutoff for rules with neither COUNT nor UNTIL.
///
/// Such a rule is expanded from `from` (or its anchor when unset) up to
/// `until`, both inclusive, and never yields more than `limit` occurrences.
/// Bounded rules are expanded in full.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizon {
    pub from: Option<DateTime<Utc>>,
    pub until: DateTime<Utc>,
    pub limit: u16,
}

impl Default for Horizon {
    /// Default window: DEFAULT_LOOKBACK_DAYS back to DEFAULT_HORIZON_DAYS ahead
    fn default() -> Self {
        Horizon::around_now(
            Duration::days(DEFAULT_LOOKBACK_DAYS),
            Duration::days(DEFAULT_HORIZON_DAYS),
            DEFAULT_MAX_OCCURRENCES,
        )
    }
}

impl Horizon {
    /// A window open towards the past.
    pub fn new(until: DateTime<Utc>, limit: u16) -> Self {
        Horizon {
            from: None,
            until,
            limit,
        }
    }

    pub fn around_now(lookback: Duration, ahead: Duration, limit: u16) -> Self {
        let now = Utc::now();
        Horizon {
            from: Some(now - lookback),
            until: now + ahead,
            limit,
        }
    }

    pub fn with_from(self, from: DateTime<Utc>) -> Self {
        Horizon {
            from: Some(from),
            ..self
        }
    }

    /// Whether an occurrence starting at `start` is inside the window.
    pub fn contains(&self, start: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| start >= from) && start <= self.until
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_window_surrounds_now() {
        let before = Utc::now();
        let horizon = Horizon::default();

        assert!(horizon.until >= before + Duration::days(DEFAULT_HORIZON_DAYS));
        assert!(horizon.from.unwrap() <= Utc::now() - Duration::days(DEFAULT_LOOKBACK_DAYS));
        assert_eq!(horizon.limit, DEFAULT_MAX_OCCURRENCES);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let until = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let horizon = Horizon::new(until, 10);
        assert!(horizon.contains(until));
        assert!(horizon.contains(until - Duration::days(10_000)));
        assert!(!horizon.contains(until + Duration::seconds(1)));

        let from = until - Duration::days(7);
        let window = horizon.with_from(from);
        assert!(window.contains(from));
        assert!(!window.contains(from - Duration::seconds(1)));
    }
}
