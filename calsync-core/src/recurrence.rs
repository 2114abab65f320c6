//! RRULE expansion for recurring event templates.
//!
//! Expands a template into its concrete occurrences up to a [`Horizon`],
//! respecting the template's exclusion dates. The template's own start is
//! always the anchor, whatever DTSTART the stored rule text carries.

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, Utc};
use rrule::RRuleSet;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::event::{EXDATE_FORMAT, EventOccurrence, EventTemplate, parse_instant};
use crate::horizon::Horizon;

/// Normalize stored rule text into property lines for the rrule parser.
///
/// DTSTART lines are dropped; a bare rule body gets an `RRULE:` prefix.
fn rule_lines(rule: &str) -> Vec<String> {
    rule.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.to_ascii_uppercase().starts_with("DTSTART"))
        .map(|line| {
            let upper = line.to_ascii_uppercase();
            let is_property = ["RRULE:", "EXRULE:", "EXDATE", "RDATE"]
                .iter()
                .any(|prefix| upper.starts_with(prefix));
            if is_property {
                line.to_string()
            } else {
                format!("RRULE:{}", line)
            }
        })
        .collect()
}

/// Parse one exclusion date: `YYYYMMDDTHHMMSSZ`, the same without `Z` (UTC),
/// or any ISO-8601 form `parse_instant` accepts.
fn parse_exdate(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, EXDATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S"))
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| parse_instant(value))
}

fn parse_exdates(exdate: &str) -> SyncResult<Vec<DateTime<Utc>>> {
    exdate
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|value| !value.is_empty())
        .map(|value| {
            parse_exdate(value).ok_or_else(|| {
                SyncError::recurrence(exdate, format!("invalid exclusion date '{}'", value))
            })
        })
        .collect()
}

/// Whether every RRULE line carries its own COUNT or UNTIL.
fn is_bounded(lines: &[String]) -> bool {
    lines
        .iter()
        .map(|line| line.to_ascii_uppercase())
        .filter(|line| line.starts_with("RRULE:"))
        .all(|line| line.contains("COUNT=") || line.contains("UNTIL="))
}

/// Build an iCalendar-format rule block anchored at `start` (whole seconds, UTC).
fn build_rrule_string(start: DateTime<Utc>, body: &[String], exdates: &[DateTime<Utc>]) -> String {
    let mut lines = Vec::with_capacity(body.len() + exdates.len() + 1);
    lines.push(format!("DTSTART:{}", start.format(EXDATE_FORMAT)));
    lines.extend(body.iter().cloned());
    for exdate in exdates {
        lines.push(format!("EXDATE:{}", exdate.format(EXDATE_FORMAT)));
    }

    lines.join("\n")
}

/// Expand a template into its occurrences, ascending by start.
///
/// - No rule: the single occurrence (start, end) unchanged.
/// - A rule with COUNT or UNTIL: every generated start.
/// - A rule with neither: the starts inside `horizon`, at most `horizon.limit`.
///
/// Each occurrence keeps the template's duration. A rule that yields nothing
/// (all starts excluded, or the series lies outside the window) falls back to
/// the single occurrence so the template stays reachable.
///
/// Fails with [`SyncError::RecurrenceParse`] when the rule or the exclusion
/// dates cannot be parsed.
pub fn expand(template: &EventTemplate, horizon: &Horizon) -> SyncResult<Vec<EventOccurrence>> {
    let rule = match &template.rrule {
        Some(rule) => rule,
        None => return Ok(vec![template.single_occurrence()]),
    };

    let exdates = match &template.exdate {
        Some(text) => parse_exdates(text)?,
        None => Vec::new(),
    };

    let body = rule_lines(rule);
    if body.is_empty() {
        return Err(SyncError::recurrence(rule, "no RRULE found"));
    }
    let bounded = is_bounded(&body);

    // DTSTART only carries whole seconds; re-apply the remainder to every occurrence
    let anchor = template
        .start
        .duration_trunc(Duration::seconds(1))
        .map_err(|e| SyncError::recurrence(rule, e))?;
    let sub_second = template.start - anchor;

    let rrule_str = build_rrule_string(anchor, &body, &exdates);
    let mut rrule_set: RRuleSet = rrule_str
        .parse()
        .map_err(|e| SyncError::recurrence(rule, e))?;

    let limit = if bounded {
        u16::MAX
    } else {
        // Pad by a second on each side; after/before are exclusive
        let tz: rrule::Tz = Utc.into();
        if let Some(from) = horizon.from {
            rrule_set = rrule_set.after((from - Duration::seconds(1)).with_timezone(&tz));
        }
        rrule_set = rrule_set.before((horizon.until + Duration::seconds(1)).with_timezone(&tz));
        horizon.limit
    };

    let result = rrule_set.all(limit);
    if result.limited {
        debug!(
            id = %template.id,
            limit,
            bounded,
            "recurrence truncated at occurrence limit"
        );
    }

    let mut starts: Vec<DateTime<Utc>> = result
        .dates
        .iter()
        .map(|dt| dt.with_timezone(&Utc) + sub_second)
        .filter(|start| bounded || horizon.contains(*start))
        .collect();
    starts.sort();
    starts.dedup();

    if starts.is_empty() {
        debug!(id = %template.id, "recurrence yields no occurrences, keeping the template start");
        return Ok(vec![template.single_occurrence()]);
    }

    Ok(starts
        .into_iter()
        .map(|start| template.occurrence_at(start))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap()
    }

    fn template(rrule: Option<&str>, exdate: Option<&str>) -> EventTemplate {
        EventTemplate {
            id: "series-1".to_string(),
            start: start(),
            end: start() + Duration::minutes(90),
            title: "Piano lesson".to_string(),
            rrule: rrule.map(String::from),
            exdate: exdate.map(String::from),
        }
    }

    fn far_horizon() -> Horizon {
        Horizon::new(start() + Duration::days(3650), 1000)
    }

    fn starts(occurrences: &[EventOccurrence]) -> Vec<DateTime<Utc>> {
        occurrences.iter().map(|o| o.start).collect()
    }

    #[test]
    fn test_no_rule_is_identity() {
        let t = template(None, None);
        let occurrences = expand(&t, &far_horizon()).unwrap();

        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].start, t.start);
        assert_eq!(occurrences[0].end, t.end);
        assert_eq!(occurrences[0].title, t.title);
        assert_eq!(occurrences[0].id, t.id);
    }

    #[test]
    fn test_identity_ignores_horizon() {
        let t = template(None, None);
        let past = Horizon::new(start() - Duration::days(10), 1);
        assert_eq!(expand(&t, &past).unwrap().len(), 1);
    }

    #[test]
    fn test_weekly_count_three() {
        let t = template(Some("FREQ=WEEKLY;COUNT=3"), None);
        let occurrences = expand(&t, &far_horizon()).unwrap();

        assert_eq!(
            starts(&occurrences),
            vec![
                start(),
                start() + Duration::days(7),
                start() + Duration::days(14)
            ]
        );
        for occurrence in &occurrences {
            assert_eq!(occurrence.duration(), Duration::minutes(90));
            assert_eq!(occurrence.id, "series-1");
        }
    }

    #[test]
    fn test_rrule_prefix_is_accepted() {
        let t = template(Some("RRULE:INTERVAL=1;FREQ=DAILY;COUNT=4"), None);
        assert_eq!(expand(&t, &far_horizon()).unwrap().len(), 4);
    }

    #[test]
    fn test_embedded_dtstart_is_overridden() {
        let t = template(
            Some("DTSTART:20200101T080000Z\nRRULE:FREQ=DAILY;COUNT=2"),
            None,
        );
        let occurrences = expand(&t, &far_horizon()).unwrap();

        assert_eq!(
            starts(&occurrences),
            vec![start(), start() + Duration::days(1)],
            "The template start must anchor the series"
        );
    }

    #[test]
    fn test_unbounded_rule_is_capped_by_horizon_end() {
        let t = template(Some("FREQ=DAILY"), None);
        let horizon = Horizon::new(start() + Duration::days(9), 1000);

        let occurrences = expand(&t, &horizon).unwrap();

        assert_eq!(occurrences.len(), 10, "Horizon end should be inclusive");
        assert_eq!(occurrences.last().unwrap().start, start() + Duration::days(9));
    }

    #[test]
    fn test_unbounded_rule_is_capped_by_limit() {
        let t = template(Some("FREQ=HOURLY"), None);
        let horizon = Horizon::new(start() + Duration::days(3650), 25);

        assert_eq!(expand(&t, &horizon).unwrap().len(), 25);
    }

    #[test]
    fn test_bounded_rule_ignores_limit() {
        let t = template(Some("FREQ=HOURLY;COUNT=500"), None);
        let horizon = Horizon::new(start() + Duration::days(3650), 25);

        assert_eq!(expand(&t, &horizon).unwrap().len(), 500);
    }

    #[test]
    fn test_bounded_rule_ignores_horizon_end() {
        let t = template(Some("FREQ=DAILY;COUNT=30"), None);
        let horizon = Horizon::new(start() + Duration::days(9), 1000);

        let occurrences = expand(&t, &horizon).unwrap();

        assert_eq!(occurrences.len(), 30);
        assert_eq!(occurrences.last().unwrap().start, start() + Duration::days(29));
    }

    #[test]
    fn test_old_unbounded_series_is_expanded_inside_window() {
        let mut t = template(Some("FREQ=DAILY"), None);
        t.start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        t.end = t.start + Duration::hours(1);
        let from = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let horizon = Horizon::new(until, 365).with_from(from);

        let occurrences = expand(&t, &horizon).unwrap();

        assert_eq!(
            occurrences.first().unwrap().start,
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(
            occurrences.last().unwrap().start,
            Utc.with_ymd_and_hms(2025, 12, 31, 9, 0, 0).unwrap()
        );
        assert_eq!(occurrences.len(), 214);
    }

    #[test]
    fn test_old_unbounded_series_reaches_the_present() {
        let mut t = template(Some("FREQ=DAILY"), None);
        t.start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        t.end = t.start + Duration::hours(1);
        let horizon = Horizon::default();

        let occurrences = expand(&t, &horizon).unwrap();
        let now = Utc::now();

        assert!(occurrences.iter().any(|o| o.start >= now));
        assert!(occurrences.last().unwrap().start > horizon.until - Duration::days(1));
    }

    #[test]
    fn test_series_past_the_horizon_keeps_its_start() {
        let t = template(Some("FREQ=WEEKLY"), None);
        let horizon = Horizon::new(start() - Duration::days(30), 1000);

        let occurrences = expand(&t, &horizon).unwrap();

        assert_eq!(starts(&occurrences), vec![start()]);
        assert_eq!(occurrences[0].end, t.end);
    }

    #[test]
    fn test_fully_excluded_series_keeps_its_start() {
        let t = template(
            Some("FREQ=DAILY;COUNT=2"),
            Some("20250320T150000Z,20250321T150000Z"),
        );

        assert_eq!(starts(&expand(&t, &far_horizon()).unwrap()), vec![start()]);
    }

    #[test]
    fn test_exdates_are_excluded() {
        let t = template(
            Some("FREQ=DAILY;COUNT=4"),
            Some("20250321T150000Z, 2025-03-22T15:00:00Z"),
        );
        let occurrences = expand(&t, &far_horizon()).unwrap();

        assert_eq!(
            starts(&occurrences),
            vec![start(), start() + Duration::days(3)]
        );
    }

    #[test]
    fn test_malformed_rule_reports_rule_text() {
        let t = template(Some("FREQ=SOMETIMES;COUNT=x"), None);

        match expand(&t, &far_horizon()) {
            Err(SyncError::RecurrenceParse { rule, .. }) => {
                assert_eq!(rule, "FREQ=SOMETIMES;COUNT=x");
            }
            other => panic!("Expected RecurrenceParse, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_exdate_is_a_parse_error() {
        let t = template(Some("FREQ=DAILY;COUNT=2"), Some("yesterday"));
        assert!(matches!(
            expand(&t, &far_horizon()),
            Err(SyncError::RecurrenceParse { .. })
        ));
    }

    #[test]
    fn test_occurrences_sorted_with_template_duration() {
        let rules = [
            "FREQ=DAILY;INTERVAL=3;COUNT=5",
            "FREQ=MONTHLY;COUNT=6",
            "FREQ=WEEKLY;BYDAY=MO,WE,FR;COUNT=9",
            "FREQ=YEARLY;COUNT=2",
        ];

        for rule in rules {
            let t = template(Some(rule), None);
            let occurrences = expand(&t, &far_horizon()).unwrap();

            assert!(!occurrences.is_empty(), "{} should expand", rule);
            assert!(
                occurrences.windows(2).all(|w| w[0].start < w[1].start),
                "{} should be strictly ascending",
                rule
            );
            assert!(
                occurrences.iter().all(|o| o.duration() == t.duration()),
                "{} should keep the template duration",
                rule
            );
        }
    }

    #[test]
    fn test_sub_second_start_is_preserved() {
        let mut t = template(Some("FREQ=DAILY;COUNT=2"), None);
        t.start += Duration::milliseconds(250);
        t.end += Duration::milliseconds(250);

        let occurrences = expand(&t, &far_horizon()).unwrap();

        assert_eq!(occurrences[0].start, t.start);
        assert_eq!(occurrences[1].start, t.start + Duration::days(1));
    }
}
