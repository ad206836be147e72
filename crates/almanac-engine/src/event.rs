//! Canonical event record shared by every other component.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::rule::RecurrenceRule;
use crate::time::{parse_timestamp, TimeBasis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Tentative => "TENTATIVE",
            EventStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONFIRMED" => Ok(EventStatus::Confirmed),
            "TENTATIVE" => Ok(EventStatus::Tentative),
            "CANCELLED" | "CANCELED" => Ok(EventStatus::Cancelled),
            other => Err(EngineError::Format(format!("unknown event status: {other}"))),
        }
    }
}

/// An organizer or attendee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: Option<String>,
    pub email: String,
    pub role: Option<String>,
    /// Participation status as written by the source (e.g. `ACCEPTED`).
    pub status: Option<String>,
    pub rsvp: bool,
}

/// Valid event priorities, 1 highest.
pub const PRIORITY_RANGE: std::ops::RangeInclusive<u8> = 1..=9;

/// A stored calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub uid: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    #[serde(default)]
    pub time_basis: TimeBasis,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// 1 (highest) through 9 (lowest).
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub status: Option<EventStatus>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub organizer: Option<Contact>,
    #[serde(default)]
    pub attendees: Vec<Contact>,
    #[serde(default)]
    pub recurrence_rule: Option<RecurrenceRule>,
}

impl Event {
    /// Build a minimal event; every optional field starts empty.
    pub fn new(uid: impl Into<String>, title: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            start,
            end: None,
            time_basis: TimeBasis::Local,
            description: None,
            location: None,
            categories: BTreeSet::new(),
            color: None,
            priority: None,
            status: None,
            is_all_day: false,
            attachments: Vec::new(),
            organizer: None,
            attendees: Vec::new(),
            recurrence_rule: None,
        }
    }

    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_rule(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence_rule = Some(rule);
        self
    }

    /// `end - start`, or `None` for an open-ended event.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence_rule.is_some()
    }

    /// Strict half-open overlap of `[start, end)` intervals.
    ///
    /// Events without an end never overlap anything, and touching intervals
    /// (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Event) -> bool {
        match (self.end, other.end) {
            (Some(a_end), Some(b_end)) => self.start < b_end && a_end > other.start,
            _ => false,
        }
    }

    /// Case-insensitive category membership.
    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

/// One concrete materialization of an event on a specific date.
///
/// Occurrences are recomputed on every query and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// The projected event. For recurring sources its uid is synthetic and its
    /// start/end are shifted to this occurrence.
    pub event: Event,
    pub is_recurring: bool,
    /// Uid of the template event this occurrence was expanded from.
    pub recurring_event_id: Option<String>,
    pub occurrence_date: NaiveDate,
}

impl Occurrence {
    /// Wrap a non-recurring event (or a recurring one whose rule was unusable).
    pub fn single(event: Event) -> Self {
        let occurrence_date = event.start.date();
        Self {
            event,
            is_recurring: false,
            recurring_event_id: None,
            occurrence_date,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.event.start
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.event.end
    }

    pub fn uid(&self) -> &str {
        &self.event.uid
    }
}

/// A timestamp field of an [`EventInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeInput {
    At(NaiveDateTime),
    Date(NaiveDate),
    Text(String),
}

impl TimeInput {
    /// Resolve to a wall-clock value, its basis, and whether it was date-only.
    pub fn resolve(&self) -> Result<(NaiveDateTime, TimeBasis, bool)> {
        match self {
            TimeInput::At(at) => Ok((*at, TimeBasis::Local, false)),
            TimeInput::Date(date) => Ok((date.and_time(NaiveTime::MIN), TimeBasis::Local, true)),
            TimeInput::Text(text) => {
                let parsed = parse_timestamp(text)?;
                Ok((parsed.at, parsed.basis, parsed.date_only))
            }
        }
    }
}

impl From<NaiveDateTime> for TimeInput {
    fn from(at: NaiveDateTime) -> Self {
        TimeInput::At(at)
    }
}

impl From<NaiveDate> for TimeInput {
    fn from(date: NaiveDate) -> Self {
        TimeInput::Date(date)
    }
}

impl From<&str> for TimeInput {
    fn from(text: &str) -> Self {
        TimeInput::Text(text.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(text: String) -> Self {
        TimeInput::Text(text)
    }
}

/// Loosely-populated event fields used by create, update, duplicate, and validate.
///
/// Absence is always an explicit `None`. For `end`, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventInput {
    pub uid: Option<String>,
    pub title: Option<String>,
    pub start: Option<TimeInput>,
    pub end: Option<Option<TimeInput>>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub categories: Option<BTreeSet<String>>,
    pub color: Option<String>,
    pub priority: Option<u8>,
    pub status: Option<EventStatus>,
    pub is_all_day: Option<bool>,
    pub attachments: Option<Vec<String>>,
    pub organizer: Option<Contact>,
    pub attendees: Option<Vec<Contact>>,
    pub recurrence_rule: Option<Option<RecurrenceRule>>,
}

impl EventInput {
    pub fn new(title: impl Into<String>, start: impl Into<TimeInput>) -> Self {
        Self {
            title: Some(title.into()),
            start: Some(start.into()),
            ..Self::default()
        }
    }

    pub fn end(mut self, end: impl Into<TimeInput>) -> Self {
        self.end = Some(Some(end.into()));
        self
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Overlay every present field onto `event`. The uid is never touched.
    pub fn apply_to(&self, event: &mut Event) -> Result<()> {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(start) = &self.start {
            let (at, basis, date_only) = start.resolve()?;
            event.start = at;
            event.time_basis = basis;
            if date_only && self.is_all_day.is_none() {
                event.is_all_day = true;
            }
        }
        if let Some(end) = &self.end {
            event.end = match end {
                Some(end) => Some(end.resolve()?.0),
                None => None,
            };
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
        if let Some(categories) = &self.categories {
            event.categories = categories.clone();
        }
        if let Some(color) = &self.color {
            event.color = Some(color.clone());
        }
        if let Some(priority) = self.priority {
            if !PRIORITY_RANGE.contains(&priority) {
                return Err(EngineError::Validation(format!(
                    "priority must be between 1 and 9, got {priority}"
                )));
            }
            event.priority = Some(priority);
        }
        if let Some(status) = self.status {
            event.status = Some(status);
        }
        if let Some(is_all_day) = self.is_all_day {
            event.is_all_day = is_all_day;
        }
        if let Some(attachments) = &self.attachments {
            event.attachments = attachments.clone();
        }
        if let Some(organizer) = &self.organizer {
            event.organizer = Some(organizer.clone());
        }
        if let Some(attendees) = &self.attendees {
            event.attendees = attendees.clone();
        }
        if let Some(rule) = &self.recurrence_rule {
            event.recurrence_rule = rule.clone();
        }
        Ok(())
    }
}
