//! Mapping between Firestore's typed JSON values and [`EventDocument`].
//!
//! Firestore wraps every field in a single-key object naming its type,
//! e.g. `{"timestampValue": "2025-03-04T09:00:00Z"}`.

use calsync_core::{EventDocument, StoredDate, Timestamp};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use tracing::debug;

pub const START_DATE: &str = "startDate";
pub const END_DATE: &str = "endDate";
pub const TITLE: &str = "title";
pub const RRULE: &str = "rRule";
pub const EXDATE: &str = "exDate";

/// Every field the app writes. Used as the update mask.
pub const FIELD_PATHS: [&str; 5] = [START_DATE, END_DATE, TITLE, RRULE, EXDATE];

pub fn from_fields(fields: &Map<String, Value>) -> EventDocument {
    EventDocument {
        start_date: stored_date(fields.get(START_DATE)),
        end_date: stored_date(fields.get(END_DATE)),
        title: text(fields, TITLE),
        rrule: text(fields, RRULE),
        exdate: text(fields, EXDATE),
    }
}

pub fn to_fields(document: &EventDocument) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(START_DATE.into(), date_value(&document.start_date));
    fields.insert(END_DATE.into(), date_value(&document.end_date));
    fields.insert(TITLE.into(), text_value(document.title.as_deref()));
    fields.insert(RRULE.into(), text_value(document.rrule.as_deref()));
    fields.insert(EXDATE.into(), text_value(document.exdate.as_deref()));
    fields
}

/// The type tag of a Firestore value, e.g. "integerValue".
fn value_kind(value: &Value) -> String {
    value
        .as_object()
        .and_then(|o| o.keys().next().cloned())
        .unwrap_or_else(|| "unknown".to_string())
}

fn stored_date(value: Option<&Value>) -> StoredDate {
    let Some(value) = value else {
        return StoredDate::Missing;
    };

    if value.get("nullValue").is_some() {
        return StoredDate::Missing;
    }

    if let Some(ts) = value.get("timestampValue").and_then(Value::as_str) {
        return match DateTime::parse_from_rfc3339(ts) {
            Ok(dt) => StoredDate::Timestamp(Timestamp::from_datetime(dt.with_timezone(&Utc))),
            Err(_) => StoredDate::Other(format!("timestampValue {}", ts)),
        };
    }

    if let Some(text) = value.get("stringValue").and_then(Value::as_str) {
        return StoredDate::Text(text.to_string());
    }

    StoredDate::Other(value_kind(value))
}

fn text(fields: &Map<String, Value>, name: &str) -> Option<String> {
    let value = fields.get(name)?;
    match value.get("stringValue").and_then(Value::as_str) {
        Some(text) => Some(text.to_string()),
        None => {
            if value.get("nullValue").is_none() {
                debug!(field = name, kind = %value_kind(value), "ignoring non-string field");
            }
            None
        }
    }
}

fn date_value(date: &StoredDate) -> Value {
    match date {
        StoredDate::Timestamp(ts) => match ts.to_datetime() {
            Some(dt) => json!({ "timestampValue": timestamp_text(dt) }),
            None => json!({ "nullValue": null }),
        },
        StoredDate::Text(text) => json!({ "stringValue": text }),
        StoredDate::Missing | StoredDate::Other(_) => json!({ "nullValue": null }),
    }
}

fn text_value(text: Option<&str>) -> Value {
    match text {
        Some(text) => json!({ "stringValue": text }),
        None => json!({ "nullValue": null }),
    }
}

fn timestamp_text(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
