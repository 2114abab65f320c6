//! Event types shared by the store, the expander and the cache.
//!
//! A stored document is read leniently into an [`EventTemplate`]; the
//! expander turns a template into one or more [`EventOccurrence`]s, which is
//! what the cache holds and the presentation layer displays.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use tracing::warn;

/// Format used when writing exclusion dates back into `exDate`.
pub const EXDATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A store-native timestamp (seconds + nanoseconds since the Unix epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }

    /// None when the timestamp is outside chrono's representable range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }
}

/// The shape a date field arrives in from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredDate {
    Timestamp(Timestamp),
    Text(String),
    Missing,
    /// Any other value type, described by name (e.g. "integerValue").
    Other(String),
}

impl StoredDate {
    /// Coerce into an instant, falling back to `now` for anything unusable.
    ///
    /// Malformed legacy documents must never block the rest of a load, so
    /// this never fails.
    pub fn to_instant(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let parsed = match self {
            StoredDate::Timestamp(ts) => ts.to_datetime(),
            StoredDate::Text(text) => parse_instant(text),
            StoredDate::Missing => None,
            StoredDate::Other(_) => None,
        };

        parsed.unwrap_or_else(|| {
            if !matches!(self, StoredDate::Missing) {
                warn!(value = %self, "unusable date value, defaulting to now");
            }
            now
        })
    }
}

impl From<DateTime<Utc>> for StoredDate {
    fn from(dt: DateTime<Utc>) -> Self {
        StoredDate::Timestamp(Timestamp::from_datetime(dt))
    }
}

impl fmt::Display for StoredDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredDate::Timestamp(ts) => write!(f, "timestamp({}.{:09})", ts.seconds, ts.nanos),
            StoredDate::Text(text) => write!(f, "'{}'", text),
            StoredDate::Missing => write!(f, "<missing>"),
            StoredDate::Other(kind) => write!(f, "<{}>", kind),
        }
    }
}

/// Parse an ISO-8601 instant.
///
/// Accepts RFC 3339, a naive date-time (read as UTC) or a bare date
/// (midnight UTC).
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Empty strings and absent values mean the same thing.
fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// The persisted field set of an event document.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDocument {
    pub start_date: StoredDate,
    pub end_date: StoredDate,
    pub title: Option<String>,
    pub rrule: Option<String>,
    pub exdate: Option<String>,
}

/// A document as listed from the store, with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub id: String,
    pub document: EventDocument,
}

/// The canonical (possibly recurring) event as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub rrule: Option<String>,
    pub exdate: Option<String>,
}

impl EventTemplate {
    /// Read a stored document, applying the lenient date policy and the
    /// default title.
    pub fn from_document(
        id: &str,
        document: &EventDocument,
        now: DateTime<Utc>,
        default_title: &str,
    ) -> Self {
        EventTemplate {
            id: id.to_string(),
            start: document.start_date.to_instant(now),
            end: document.end_date.to_instant(now),
            title: normalize_text(document.title.as_deref())
                .unwrap_or_else(|| default_title.to_string()),
            rrule: normalize_text(document.rrule.as_deref()),
            exdate: normalize_text(document.exdate.as_deref()),
        }
    }

    /// Build a not-yet-persisted template from an add request.
    /// Omitted start/end become `now`; the id stays empty until the store assigns one.
    pub fn from_patch(patch: &EventPatch, now: DateTime<Utc>, default_title: &str) -> Self {
        EventTemplate {
            id: String::new(),
            start: patch.start.unwrap_or(now),
            end: patch.end.unwrap_or(now),
            title: normalize_text(patch.title.as_deref())
                .unwrap_or_else(|| default_title.to_string()),
            rrule: normalize_text(patch.rrule.as_deref()),
            exdate: normalize_text(patch.exdate.as_deref()),
        }
    }

    pub fn to_document(&self) -> EventDocument {
        EventDocument {
            start_date: self.start.into(),
            end_date: self.end.into(),
            title: Some(self.title.clone()),
            rrule: Some(self.rrule.clone().unwrap_or_default()),
            exdate: Some(self.exdate.clone().unwrap_or_default()),
        }
    }

    /// Apply a patch: provided fields win, omitted ones keep the current value.
    /// An empty `rRule`/`exDate` in the patch clears the field.
    pub fn merged(&self, patch: &EventPatch) -> Self {
        EventTemplate {
            id: self.id.clone(),
            start: patch.start.unwrap_or(self.start),
            end: patch.end.unwrap_or(self.end),
            title: normalize_text(patch.title.as_deref()).unwrap_or_else(|| self.title.clone()),
            rrule: match &patch.rrule {
                Some(rule) => normalize_text(Some(rule.as_str())),
                None => self.rrule.clone(),
            },
            exdate: match &patch.exdate {
                Some(dates) => normalize_text(Some(dates.as_str())),
                None => self.exdate.clone(),
            },
        }
    }

    /// Copy of this template with `start` appended to its exclusion dates.
    pub fn with_exclusion(&self, start: DateTime<Utc>) -> Self {
        let excluded = start.format(EXDATE_FORMAT).to_string();
        let exdate = match &self.exdate {
            Some(existing) => format!("{},{}", existing, excluded),
            None => excluded,
        };
        EventTemplate {
            exdate: Some(exdate),
            ..self.clone()
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_recurring(&self) -> bool {
        self.rrule.is_some()
    }

    /// The identity expansion: the template's own start and end.
    pub fn single_occurrence(&self) -> EventOccurrence {
        self.occurrence_at(self.start)
    }

    /// An occurrence starting at `start`, keeping the template's duration.
    pub fn occurrence_at(&self, start: DateTime<Utc>) -> EventOccurrence {
        EventOccurrence {
            id: self.id.clone(),
            start,
            end: start + self.duration(),
            title: self.title.clone(),
            series: self.clone(),
        }
    }
}

/// Identifies one displayed occurrence: the template id plus its start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccurrenceKey {
    pub template_id: String,
    pub start: DateTime<Utc>,
}

impl fmt::Display for OccurrenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.template_id, self.start.format(EXDATE_FORMAT))
    }
}

/// One concrete displayed instance of a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventOccurrence {
    /// Inherited from the template; shared by all occurrences of a series.
    pub id: String,
    #[serde(rename = "startDate")]
    pub start: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end: DateTime<Utc>,
    pub title: String,
    /// The series this occurrence was expanded from, as currently cached.
    #[serde(skip)]
    pub series: EventTemplate,
}

impl EventOccurrence {
    pub fn key(&self) -> OccurrenceKey {
        OccurrenceKey {
            template_id: self.id.clone(),
            start: self.start,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Read an optional instant with [`parse_instant`], so patches accept the
/// same date forms as stored documents.
fn deserialize_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(text) => parse_instant(&text)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date/time '{}'", text))),
    }
}

/// A partial field set, as emitted by the presentation layer for adds and edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(
        rename = "startDate",
        default,
        deserialize_with = "deserialize_instant",
        skip_serializing_if = "Option::is_none"
    )]
    pub start: Option<DateTime<Utc>>,
    #[serde(
        rename = "endDate",
        default,
        deserialize_with = "deserialize_instant",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "rRule", skip_serializing_if = "Option::is_none")]
    pub rrule: Option<String>,
    #[serde(rename = "exDate", skip_serializing_if = "Option::is_none")]
    pub exdate: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == EventPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, h, 0, 0).unwrap()
    }

    fn template() -> EventTemplate {
        EventTemplate {
            id: "abc".to_string(),
            start: at(15),
            end: at(16),
            title: "Standup".to_string(),
            rrule: None,
            exdate: None,
        }
    }

    #[test]
    fn test_timestamp_roundtrip_through_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap();
        let ts = Timestamp::from_datetime(dt);
        assert_eq!(ts.to_datetime(), Some(dt));
    }

    #[test]
    fn test_parse_instant_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_instant("2024-01-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_instant("2024-01-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_instant("2024-01-01T10:00:00"), Some(expected));
        assert_eq!(parse_instant("2024-01-01T10:00"), Some(expected));
        assert_eq!(
            parse_instant("2024-01-01"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_instant("next tuesday"), None);
        assert_eq!(parse_instant(""), None);
    }

    #[test]
    fn test_stored_date_falls_back_to_now() {
        let now = at(9);
        assert_eq!(StoredDate::Missing.to_instant(now), now);
        assert_eq!(StoredDate::Other("integerValue".into()).to_instant(now), now);
        assert_eq!(StoredDate::Text("garbage".into()).to_instant(now), now);
        assert_eq!(StoredDate::from(at(15)).to_instant(now), at(15));
        assert_eq!(
            StoredDate::Text("2025-03-20T15:00:00Z".into()).to_instant(now),
            at(15)
        );
    }

    #[test]
    fn test_from_document_applies_defaults() {
        let doc = EventDocument {
            start_date: StoredDate::Missing,
            end_date: StoredDate::Text("2025-03-20T16:00:00Z".into()),
            title: Some("   ".into()),
            rrule: Some(String::new()),
            exdate: None,
        };

        let template = EventTemplate::from_document("x1", &doc, at(9), "Untitled Event");

        assert_eq!(template.id, "x1");
        assert_eq!(template.start, at(9));
        assert_eq!(template.end, at(16));
        assert_eq!(template.title, "Untitled Event");
        assert_eq!(template.rrule, None, "Empty rule should mean no rule");
    }

    #[test]
    fn test_to_document_writes_empty_strings_for_absent_rule() {
        let doc = template().to_document();
        assert_eq!(doc.rrule.as_deref(), Some(""));
        assert_eq!(doc.exdate.as_deref(), Some(""));
        assert_eq!(doc.start_date, StoredDate::from(at(15)));
    }

    #[test]
    fn test_merge_keeps_omitted_fields() {
        let patch = EventPatch {
            title: Some("Retro".into()),
            ..Default::default()
        };

        let merged = template().merged(&patch);

        assert_eq!(merged.title, "Retro");
        assert_eq!(merged.start, at(15));
        assert_eq!(merged.end, at(16));
        assert_eq!(merged.id, "abc");
    }

    #[test]
    fn test_merge_empty_rule_clears_recurrence() {
        let recurring = EventTemplate {
            rrule: Some("FREQ=DAILY;COUNT=2".into()),
            ..template()
        };
        let patch = EventPatch {
            rrule: Some(String::new()),
            ..Default::default()
        };

        assert!(!recurring.merged(&patch).is_recurring());
        assert!(recurring.merged(&EventPatch::default()).is_recurring());
    }

    #[test]
    fn test_with_exclusion_appends() {
        let t = EventTemplate {
            exdate: Some("20250101T100000Z".into()),
            ..template()
        };
        let excluded = t.with_exclusion(at(15));
        assert_eq!(
            excluded.exdate.as_deref(),
            Some("20250101T100000Z,20250320T150000Z")
        );
        assert_eq!(
            template().with_exclusion(at(15)).exdate.as_deref(),
            Some("20250320T150000Z")
        );
    }

    #[test]
    fn test_patch_deserializes_presentation_json() {
        let json = r#"{"startDate":"2025-03-20T15:00:00Z","title":"Lunch","rRule":"FREQ=DAILY"}"#;
        let patch: EventPatch = serde_json::from_str(json).expect("Should parse patch");
        assert_eq!(patch.start, Some(at(15)));
        assert_eq!(patch.end, None);
        assert_eq!(patch.title.as_deref(), Some("Lunch"));
        assert_eq!(patch.rrule.as_deref(), Some("FREQ=DAILY"));
    }

    #[test]
    fn test_patch_accepts_lenient_dates() {
        let json = r#"{"startDate":"2025-03-20T15:00","endDate":"2025-03-21","title":null}"#;
        let patch: EventPatch = serde_json::from_str(json).expect("Should parse patch");
        assert_eq!(patch.start, Some(at(15)));
        assert_eq!(
            patch.end,
            Some(Utc.with_ymd_and_hms(2025, 3, 21, 0, 0, 0).unwrap())
        );

        let null_dates: EventPatch =
            serde_json::from_str(r#"{"startDate":null}"#).expect("Should parse patch");
        assert!(null_dates.is_empty());
    }

    #[test]
    fn test_patch_rejects_unparsable_dates() {
        let result = serde_json::from_str::<EventPatch>(r#"{"startDate":"next tuesday"}"#);
        assert!(result.is_err());
    }
}
