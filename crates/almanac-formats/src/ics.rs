//! iCalendar (RFC 5545) reading and writing on top of the `icalendar` crate.
//!
//! The crate handles line folding and the content-line grammar. Values come
//! back verbatim, so TEXT escaping is applied here in both directions.
//!
//! The reader is tolerant inside a calendar: unknown properties and nested
//! components are skipped, an unparsable RRULE is dropped with a warning, and
//! a VEVENT without DTSTART is dropped entirely.

use std::collections::BTreeSet;

use almanac_engine::time::ParsedTime;
use almanac_engine::{
    format_rule, parse_rule, parse_timestamp, Contact, Event, EventStatus, RecurrenceRule,
    TimeBasis, PRIORITY_RANGE,
};
use chrono::{NaiveDateTime, NaiveTime};
use icalendar::parser::{
    read_calendar, unfold, Component as ParsedComponent, Property as ParsedProperty,
};
use icalendar::{Calendar, Component, Property, ValueType};
use tracing::{debug, warn};

use crate::error::{FormatError, Result};
use crate::uid::UidAllocator;

const PRODID: &str = "PRODID:-//almanac//almanac-formats//EN";
const DEFAULT_TITLE: &str = "Untitled Event";

/// Parse every VEVENT in `text`, assigning uids unique within this call.
pub fn parse_calendar(text: &str) -> Result<Vec<Event>> {
    parse_calendar_with(text, &mut UidAllocator::default())
}

/// Like [`parse_calendar`], drawing uids from a caller-supplied allocator.
pub fn parse_calendar_with(text: &str, uids: &mut UidAllocator) -> Result<Vec<Event>> {
    let unfolded = unfold(text);
    let calendar = read_calendar(&unfolded).map_err(|e| FormatError::Ics(e.to_string()))?;

    let events: Vec<Event> = calendar
        .components
        .iter()
        .filter(|c| c.name.as_ref().eq_ignore_ascii_case("VEVENT"))
        .filter_map(|vevent| read_event(vevent, uids))
        .collect();

    debug!(count = events.len(), "parsed calendar");
    Ok(events)
}

/// Serialize events as a VCALENDAR with CRLF line endings and folded lines.
pub fn write_calendar(events: &[Event]) -> String {
    let mut calendar = Calendar::new();
    for event in events {
        calendar.push(to_vevent(event));
    }
    let calendar = calendar.done();
    rewrite_header(&calendar.to_string())
}

fn read_event(vevent: &ParsedComponent<'_>, uids: &mut UidAllocator) -> Option<Event> {
    let mut draft = Draft::default();
    for prop in &vevent.properties {
        draft.apply(prop);
    }
    if !vevent.components.is_empty() {
        debug!(count = vevent.components.len(), "skipping nested components");
    }
    draft.finish(uids)
}

fn to_vevent(event: &Event) -> icalendar::Event {
    let mut vevent = icalendar::Event::new();
    vevent.add_property("UID", escape(&event.uid));
    vevent.append_property(time_property("DTSTART", event.start, event));
    if let Some(end) = event.end {
        vevent.append_property(time_property("DTEND", end, event));
    }
    vevent.add_property("SUMMARY", escape(&event.title));
    if let Some(description) = &event.description {
        vevent.add_property("DESCRIPTION", escape(description));
    }
    if let Some(location) = &event.location {
        vevent.add_property("LOCATION", escape(location));
    }
    if !event.categories.is_empty() {
        let categories: Vec<String> = event.categories.iter().map(|c| escape(c)).collect();
        vevent.add_property("CATEGORIES", categories.join(","));
    }
    if let Some(priority) = event.priority {
        vevent.add_property("PRIORITY", priority.to_string());
    }
    if let Some(status) = event.status {
        vevent.add_property("STATUS", status.to_string());
    }
    if let Some(color) = &event.color {
        vevent.add_property("COLOR", escape(color));
    }
    for attachment in &event.attachments {
        vevent.append_multi_property(Property::new("ATTACH", escape(attachment)));
    }
    if let Some(organizer) = &event.organizer {
        vevent.append_property(contact_property("ORGANIZER", organizer));
    }
    for attendee in &event.attendees {
        vevent.append_multi_property(contact_property("ATTENDEE", attendee));
    }
    if let Some(rule) = &event.recurrence_rule {
        vevent.add_property("RRULE", format_rule(rule));
    }
    vevent.done()
}

fn time_property(name: &str, at: NaiveDateTime, event: &Event) -> Property {
    if event.is_all_day && at.time() == NaiveTime::MIN {
        let mut prop = Property::new(name, at.format("%Y%m%d").to_string());
        prop.append_parameter(ValueType::Date);
        prop
    } else if event.time_basis == TimeBasis::Utc {
        Property::new(name, at.format("%Y%m%dT%H%M%SZ").to_string())
    } else {
        Property::new(name, at.format("%Y%m%dT%H%M%S").to_string())
    }
}

fn contact_property(name: &str, contact: &Contact) -> Property {
    let mut prop = Property::new(name, format!("mailto:{}", contact.email));
    if let Some(cn) = &contact.name {
        prop.add_parameter("CN", &param_value(cn));
    }
    if let Some(role) = &contact.role {
        prop.add_parameter("ROLE", &param_value(role));
    }
    if let Some(status) = &contact.status {
        prop.add_parameter("PARTSTAT", &param_value(status));
    }
    if contact.rsvp {
        prop.add_parameter("RSVP", "TRUE");
    }
    prop
}

/// Parameter values cannot carry a DQUOTE or a line break.
fn param_value(value: &str) -> String {
    value.replace(['"', '\r', '\n'], "")
}

/// Replace the crate's PRODID and drop the default CALSCALE.
fn rewrite_header(ics: &str) -> String {
    let mut out = String::with_capacity(ics.len());
    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            out.push_str(PRODID);
        } else if line == "CALSCALE:GREGORIAN" {
            continue;
        } else {
            out.push_str(line);
        }
        out.push_str("\r\n");
    }
    out
}

/// Escape a TEXT value.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Reverse TEXT escaping: `\n`/`\N`, `\,`, `\;`, `\\`. Unknown escapes keep the backslash.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') | Some('N') => {
                out.push('\n');
                chars.next();
            }
            Some(&(escaped @ (',' | ';' | '\\'))) => {
                out.push(escaped);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Split on commas that are not backslash-escaped. Pieces stay escaped.
fn split_unescaped_commas(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Case-insensitive parameter lookup, with surrounding quotes removed.
fn param<'p>(prop: &'p ParsedProperty<'_>, key: &str) -> Option<&'p str> {
    prop.params
        .iter()
        .find(|p| p.key.as_ref().eq_ignore_ascii_case(key))
        .and_then(|p| p.val.as_ref())
        .map(|v| v.as_ref().trim_matches('"'))
}

/// Properties collected for one VEVENT.
#[derive(Debug, Default)]
struct Draft {
    uid: Option<String>,
    title: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<ParsedTime>,
    end: Option<ParsedTime>,
    categories: BTreeSet<String>,
    priority: Option<u8>,
    status: Option<EventStatus>,
    color: Option<String>,
    attachments: Vec<String>,
    organizer: Option<Contact>,
    attendees: Vec<Contact>,
    rule: Option<RecurrenceRule>,
}

impl Draft {
    fn apply(&mut self, prop: &ParsedProperty<'_>) {
        let value: &str = prop.val.as_ref();
        match prop.name.as_ref().to_ascii_uppercase().as_str() {
            "UID" => self.uid = Some(unescape(value)),
            "SUMMARY" => self.title = Some(unescape(value)),
            "DESCRIPTION" => self.description = Some(unescape(value)),
            "LOCATION" => self.location = Some(unescape(value)),
            "DTSTART" => self.start = parse_time(prop),
            "DTEND" => self.end = parse_time(prop),
            "CATEGORIES" => {
                for category in split_unescaped_commas(value) {
                    let category = unescape(category).trim().to_string();
                    if !category.is_empty() {
                        self.categories.insert(category);
                    }
                }
            }
            "PRIORITY" => {
                self.priority = value
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .filter(|p| PRIORITY_RANGE.contains(p));
            }
            "STATUS" => match value.parse::<EventStatus>() {
                Ok(status) => self.status = Some(status),
                Err(e) => debug!(error = %e, "ignoring STATUS"),
            },
            "COLOR" => self.color = Some(unescape(value.trim())),
            "ATTACH" => self.attachments.push(unescape(value.trim())),
            "ORGANIZER" => self.organizer = Some(parse_contact(prop)),
            "ATTENDEE" => self.attendees.push(parse_contact(prop)),
            "RRULE" => match parse_rule(value) {
                Ok(rule) => self.rule = Some(rule),
                Err(e) => warn!(error = %e, rule = %value, "dropping unparsable RRULE"),
            },
            _ => {}
        }
    }

    fn finish(self, uids: &mut UidAllocator) -> Option<Event> {
        let Some(start) = self.start else {
            debug!(uid = ?self.uid, "dropping VEVENT without DTSTART");
            return None;
        };

        let uid = uids.allocate(self.uid.as_deref());
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let mut event = Event::new(uid, title, start.at);
        event.end = self.end.map(|end| end.at);
        event.time_basis = start.basis;
        event.is_all_day = start.date_only;
        event.description = self.description;
        event.location = self.location;
        event.categories = self.categories;
        event.priority = self.priority;
        event.status = self.status;
        event.color = self.color;
        event.attachments = self.attachments;
        event.organizer = self.organizer;
        event.attendees = self.attendees;
        event.recurrence_rule = self.rule;
        Some(event)
    }
}

/// DTSTART/DTEND: `VALUE=DATE` or 8 digits is a date; trailing `Z` is UTC;
/// anything else (including `TZID=`) is local wall-clock time.
fn parse_time(prop: &ParsedProperty<'_>) -> Option<ParsedTime> {
    let value: &str = prop.val.as_ref();
    match parse_timestamp(value.trim()) {
        Ok(mut parsed) => {
            if param(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE")) {
                parsed.at = parsed.at.date().and_time(NaiveTime::MIN);
                parsed.date_only = true;
            }
            Some(parsed)
        }
        Err(e) => {
            let name: &str = prop.name.as_ref();
            debug!(property = name, error = %e, "ignoring unparsable timestamp");
            None
        }
    }
}

fn parse_contact(prop: &ParsedProperty<'_>) -> Contact {
    let value: &str = prop.val.as_ref();
    let value = value.trim();
    let email = match value.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("mailto:") => &value[7..],
        _ => value,
    };
    Contact {
        name: param(prop, "CN").map(str::to_string),
        email: email.to_string(),
        role: param(prop, "ROLE").map(str::to_string),
        status: param(prop, "PARTSTAT").map(str::to_string),
        rsvp: param(prop, "RSVP").is_some_and(|v| v.eq_ignore_ascii_case("TRUE")),
    }
}
