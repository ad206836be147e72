//! # almanac-engine
//!
//! In-memory calendar event engine: stores events, answers time-range queries,
//! detects scheduling conflicts, and expands recurrence rules into concrete
//! occurrences.
//!
//! ## Quick start
//!
//! ```rust
//! use almanac_engine::{parse_rule, expand_occurrences, Event, ExpandOptions};
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap().and_hms_opt(9, 0, 0).unwrap();
//! let standup = Event::new("standup", "Standup", start)
//!     .with_rule(parse_rule("FREQ=WEEKLY;COUNT=4").unwrap());
//!
//! let occurrences = expand_occurrences(&standup, None, None, ExpandOptions::default());
//! assert_eq!(occurrences.len(), 4);
//! ```
//!
//! ## Modules
//!
//! - [`event`] — canonical `Event`, `Occurrence`, and the loose `EventInput` record
//! - [`rule`] — RRULE text ↔ `RecurrenceRule`
//! - [`expander`] — bounded rule expansion into occurrences
//! - [`store`] — in-memory collection with range, search, and category queries
//! - [`conflict`] — half-open overlap detection
//! - [`freebusy`] — busy blocks and free slots under a busy policy
//! - [`grid`] — month-view grid structure
//! - [`manager`] — CRUD, validation, and identity rules over the store
//! - [`week`] — ISO-8601 week numbering
//! - [`time`] — timestamp parsing and month arithmetic
//! - [`config`] — engine tunables loaded from TOML
//! - [`error`] — Error types

pub mod config;
pub mod conflict;
pub mod error;
pub mod event;
pub mod expander;
pub mod freebusy;
pub mod grid;
pub mod manager;
pub mod rule;
pub mod store;
pub mod time;
pub mod week;

pub use config::EngineConfig;
pub use conflict::{find_conflicting_pairs, overlap_minutes, Conflict};
pub use error::EngineError;
pub use event::{
    Contact, Event, EventInput, EventStatus, Occurrence, TimeInput, PRIORITY_RANGE,
};
pub use expander::{expand_occurrences, expand_rule_text, occurrences, ExpandOptions, Occurrences};
pub use freebusy::{find_free_slots, BusyBlock, BusyPolicy, FreeBusy, FreeSlot};
pub use grid::{DayCell, GridCell, MonthGrid};
pub use manager::{validate, EventManager, ValidationResult};
pub use rule::{format_rule, parse_rule, Frequency, RecurrenceRule, RuleUntil};
pub use store::EventStore;
pub use time::{parse_timestamp, TimeBasis};
pub use week::{week_number, week_year};
