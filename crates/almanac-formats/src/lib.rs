//! # almanac-formats
//!
//! Adapters between foreign calendar text and [`almanac_engine::Event`].
//!
//! Both readers normalize into the engine's canonical event shape, drop records
//! that lack a start, and assign uids that are unique within a single call.
//!
//! ## Quick start
//!
//! ```rust
//! use almanac_formats::{parse_calendar, write_events};
//!
//! let ics = "BEGIN:VCALENDAR\r\n\
//!            BEGIN:VEVENT\r\n\
//!            UID:standup\r\n\
//!            SUMMARY:Standup\\, daily\r\n\
//!            DTSTART:20260302T090000Z\r\n\
//!            RRULE:FREQ=DAILY;COUNT=5\r\n\
//!            END:VEVENT\r\n\
//!            END:VCALENDAR\r\n";
//!
//! let events = parse_calendar(ics).unwrap();
//! assert_eq!(events[0].title, "Standup, daily");
//!
//! let json = write_events(&events).unwrap();
//! assert!(json.contains("\"recurrence_rule\": \"FREQ=DAILY;COUNT=5\""));
//! ```
//!
//! ## Modules
//!
//! - [`ics`] — iCalendar reader and writer
//! - [`json`] — alias-tolerant JSON reader and canonical writer
//! - [`uid`] — per-call uid uniqueness
//! - [`error`] — Error types

pub mod error;
pub mod ics;
pub mod json;
pub mod uid;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use almanac_engine::Event;

pub use error::FormatError;
pub use ics::{parse_calendar, parse_calendar_with, write_calendar};
pub use json::{parse_events, parse_events_with, write_events};
pub use uid::UidAllocator;

/// A calendar text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ics,
    Json,
}

impl Format {
    /// Guess from a file extension (`.ics`, `.ical`, `.ifb`, `.json`).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        ext.parse().ok()
    }

    /// Read events in this format.
    pub fn read(self, text: &str, uids: &mut UidAllocator) -> error::Result<Vec<Event>> {
        match self {
            Format::Ics => parse_calendar_with(text, uids),
            Format::Json => parse_events_with(text, uids),
        }
    }

    /// Write events in this format.
    pub fn write(self, events: &[Event]) -> error::Result<String> {
        match self {
            Format::Ics => Ok(write_calendar(events)),
            Format::Json => write_events(events),
        }
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ics" | "ical" | "ifb" | "icalendar" => Ok(Format::Ics),
            "json" => Ok(Format::Json),
            other => Err(FormatError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Ics => "ics",
            Format::Json => "json",
        })
    }
}
