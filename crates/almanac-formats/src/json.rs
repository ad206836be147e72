//! JSON event normalization.
//!
//! Accepts loosely-shaped event objects from other tools and maps them onto
//! [`Event`]. Each semantic field is looked up through an ordered list of
//! candidate keys; the first key holding a non-null value wins.

use std::collections::BTreeSet;

use almanac_engine::time::ParsedTime;
use almanac_engine::{
    parse_rule, parse_timestamp, Contact, Event, EventStatus, TimeBasis, PRIORITY_RANGE,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{FormatError, Result};
use crate::uid::UidAllocator;

const DEFAULT_TITLE: &str = "Untitled Event";

const UID_KEYS: &[&str] = &["uid", "id"];
const TITLE_KEYS: &[&str] = &["title", "summary", "name"];
const START_KEYS: &[&str] = &["start", "startDate", "startTime"];
const END_KEYS: &[&str] = &["end", "endDate", "endTime"];
const DESCRIPTION_KEYS: &[&str] = &["description", "desc"];
const LOCATION_KEYS: &[&str] = &["location", "place"];
const CATEGORY_KEYS: &[&str] = &["categories", "category", "tags"];
const ALL_DAY_KEYS: &[&str] = &["allDay", "isAllDay", "all_day", "is_all_day"];
const ATTACHMENT_KEYS: &[&str] = &["attachments", "attachment"];
const RULE_KEYS: &[&str] = &["rrule", "recurrenceRule", "recurrence_rule", "recurrence"];
const BASIS_KEYS: &[&str] = &["time_basis", "timeBasis"];

/// Parse JSON text holding an event array, `{"events": [...]}`, or one event object.
///
/// # Errors
/// `FormatError::Json` when the text is not JSON, `FormatError::Shape` when it
/// is JSON of any other shape.
pub fn parse_events(text: &str) -> Result<Vec<Event>> {
    parse_events_with(text, &mut UidAllocator::default())
}

/// Like [`parse_events`], drawing uids from a caller-supplied allocator.
pub fn parse_events_with(text: &str, uids: &mut UidAllocator) -> Result<Vec<Event>> {
    let root: Value = serde_json::from_str(text)?;
    let records = match root {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("events") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(FormatError::Shape(format!(
                    "\"events\" must be an array, found {}",
                    kind(&other)
                )))
            }
            None => vec![Value::Object(object)],
        },
        other => {
            return Err(FormatError::Shape(format!(
                "expected an event object or array, found {}",
                kind(&other)
            )))
        }
    };

    let mut events = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let Value::Object(object) = record else {
            debug!(index, kind = kind(record), "skipping non-object entry");
            continue;
        };
        match normalize(object, uids) {
            Some(event) => events.push(event),
            None => debug!(index, "dropping entry without a usable start"),
        }
    }

    debug!(count = events.len(), "parsed JSON events");
    Ok(events)
}

/// Pretty-print events in their canonical serialized form.
pub fn write_events(events: &[Event]) -> Result<String> {
    Ok(serde_json::to_string_pretty(events)?)
}

fn normalize(object: &Map<String, Value>, uids: &mut UidAllocator) -> Option<Event> {
    let start = pick(object, START_KEYS).and_then(|v| timestamp(v, "start"))?;
    let end = pick(object, END_KEYS).and_then(|v| timestamp(v, "end"));

    let uid = uids.allocate(pick(object, UID_KEYS).and_then(text).as_deref());
    let title = pick(object, TITLE_KEYS)
        .and_then(text)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let mut event = Event::new(uid, title, start.at);
    event.end = end.map(|e| e.at);
    event.time_basis = pick(object, BASIS_KEYS)
        .and_then(Value::as_str)
        .map(|b| {
            if b.eq_ignore_ascii_case("utc") {
                TimeBasis::Utc
            } else {
                TimeBasis::Local
            }
        })
        .unwrap_or(start.basis);
    event.is_all_day = pick(object, ALL_DAY_KEYS)
        .and_then(Value::as_bool)
        .unwrap_or(start.date_only);
    event.description = pick(object, DESCRIPTION_KEYS).and_then(text);
    event.location = pick(object, LOCATION_KEYS).and_then(text);
    event.categories = pick(object, CATEGORY_KEYS)
        .map(categories)
        .unwrap_or_default();
    event.color = object.get("color").and_then(text);
    event.priority = object.get("priority").and_then(priority);
    event.status = object
        .get("status")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<EventStatus>().ok());
    event.attachments = pick(object, ATTACHMENT_KEYS)
        .map(strings)
        .unwrap_or_default();
    event.organizer = object.get("organizer").and_then(contact);
    event.attendees = object
        .get("attendees")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(contact).collect())
        .unwrap_or_default();
    event.recurrence_rule = pick(object, RULE_KEYS)
        .and_then(Value::as_str)
        .and_then(|rule| match parse_rule(rule) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!(uid = %event.uid, error = %e, "dropping unparsable recurrence rule");
                None
            }
        });

    Some(event)
}

/// First candidate key holding a non-null value.
fn pick<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find(|v| !v.is_null())
}

/// Strings are parsed as timestamps; numbers are epoch milliseconds (UTC).
fn timestamp(value: &Value, field: &str) -> Option<ParsedTime> {
    let parsed = match value {
        Value::String(s) => parse_timestamp(s).ok(),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| ParsedTime {
                at: dt.naive_utc(),
                basis: TimeBasis::Utc,
                date_only: false,
            }),
        _ => None,
    };
    if parsed.is_none() {
        debug!(field, value = %value, "ignoring unparsable timestamp");
    }
    parsed
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An array of strings or one comma-separated string.
fn categories(value: &Value) -> BTreeSet<String> {
    let raw: Vec<String> = match value {
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        other => strings(other),
    };
    raw.into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn strings(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// 1 through 9, from a number or a numeric string.
fn priority(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    u8::try_from(n).ok().filter(|p| PRIORITY_RANGE.contains(p))
}

/// A bare email string or an object with `email` and optional details.
fn contact(value: &Value) -> Option<Contact> {
    match value {
        Value::String(email) => Some(Contact {
            email: strip_mailto(email),
            ..Contact::default()
        }),
        Value::Object(object) => {
            let email = object.get("email").and_then(Value::as_str)?;
            Some(Contact {
                name: pick(object, &["name", "cn"]).and_then(text),
                email: strip_mailto(email),
                role: object.get("role").and_then(text),
                status: pick(object, &["status", "partstat"]).and_then(text),
                rsvp: object.get("rsvp").and_then(Value::as_bool).unwrap_or(false),
            })
        }
        _ => None,
    }
}

fn strip_mailto(email: &str) -> String {
    let email = email.trim();
    match email.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("mailto:") => email[7..].to_string(),
        _ => email.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_non_null_alias_wins() {
        let object = json!({ "title": null, "summary": "From summary", "name": "From name" });
        let object = object.as_object().unwrap();
        assert_eq!(pick(object, TITLE_KEYS).and_then(text).as_deref(), Some("From summary"));
    }

    #[test]
    fn priority_accepts_numbers_and_strings_in_range() {
        assert_eq!(priority(&json!(3)), Some(3));
        assert_eq!(priority(&json!("9")), Some(9));
        assert_eq!(priority(&json!(0)), None);
        assert_eq!(priority(&json!(300)), None);
    }

    #[test]
    fn contact_from_string_or_object() {
        let bare = contact(&json!("mailto:a@example.com")).unwrap();
        assert_eq!(bare.email, "a@example.com");

        let full = contact(&json!({ "name": "Bo", "email": "bo@example.com", "rsvp": true })).unwrap();
        assert_eq!(full.name.as_deref(), Some("Bo"));
        assert!(full.rsvp);
        assert!(contact(&json!({ "name": "No email" })).is_none());
    }
}
