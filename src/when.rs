//! Parsing of date/time and duration arguments.

use anyhow::{Context, Result};
use calsync_core::parse_instant;
use chrono::{DateTime, Duration, Utc};

/// Default length of an event given only a start.
pub const DEFAULT_DURATION_HOURS: i64 = 1;

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (UTC) or `YYYY-MM-DD`.
pub fn parse_when(input: &str) -> Result<DateTime<Utc>> {
    parse_instant(input).ok_or_else(|| {
        anyhow::anyhow!(
            "Could not parse date/time: \"{}\" (expected e.g. 2025-03-20T15:00 or 2025-03-20)",
            input
        )
    })
}

pub fn parse_duration(input: &str) -> Result<Duration> {
    let std_duration = humantime::parse_duration(input)
        .with_context(|| format!("Invalid duration: \"{}\"", input))?;
    Duration::from_std(std_duration).with_context(|| format!("Duration too large: \"{}\"", input))
}

/// End of an event from `--end`, `--duration`, or the default length.
pub fn resolve_end(
    start: DateTime<Utc>,
    end: Option<&str>,
    duration: Option<&str>,
) -> Result<DateTime<Utc>> {
    let end = match (end, duration) {
        (Some(end), _) => parse_when(end)?,
        (None, Some(duration)) => start + parse_duration(duration)?,
        (None, None) => start + Duration::hours(DEFAULT_DURATION_HOURS),
    };

    if end < start {
        anyhow::bail!("End ({}) is before start ({})", end, start);
    }
    Ok(end)
}
