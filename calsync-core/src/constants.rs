/// How far ahead unbounded recurrence rules are expanded, in days.
pub const DEFAULT_HORIZON_DAYS: i64 = 365;

/// How far back unbounded recurrence rules are expanded, in days.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Upper bound on occurrences an unbounded rule produces inside the window.
pub const DEFAULT_MAX_OCCURRENCES: u16 = 1000;

pub const DEFAULT_TITLE: &str = "Untitled Event";

pub const DEFAULT_LOCALE: &str = "pl-PL";
