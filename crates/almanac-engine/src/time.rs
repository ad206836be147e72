//! Timestamp parsing and calendar arithmetic helpers.
//!
//! The engine works on wall-clock [`NaiveDateTime`] values. The only zone
//! distinction it keeps is whether a value was written in UTC or as a floating
//! local time ([`TimeBasis`]); no conversion between the two is ever made.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Whether a timestamp was expressed in UTC or as naive local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
    Utc,
    #[default]
    Local,
}

/// Result of [`parse_timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTime {
    pub at: NaiveDateTime,
    pub basis: TimeBasis,
    /// The text carried a date but no time of day.
    pub date_only: bool,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%Y%m%dT%H%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Parse the timestamp shapes accepted anywhere in the engine.
///
/// RFC 3339 values with an offset are normalized to UTC; a trailing `Z` marks UTC;
/// anything else is local wall-clock time. Date-only text resolves to midnight.
pub fn parse_timestamp(text: &str) -> Result<ParsedTime> {
    let text = text.trim();
    if text.is_empty() {
        return Err(EngineError::Format("empty timestamp".to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(ParsedTime {
            at: dt.naive_utc(),
            basis: TimeBasis::Utc,
            date_only: false,
        });
    }

    let (body, basis) = match text.strip_suffix(['Z', 'z']) {
        Some(body) => (body, TimeBasis::Utc),
        None => (text, TimeBasis::Local),
    };

    for fmt in DATETIME_FORMATS {
        if let Ok(at) = NaiveDateTime::parse_from_str(body, fmt) {
            return Ok(ParsedTime {
                at,
                basis,
                date_only: false,
            });
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(body, fmt) {
            return Ok(ParsedTime {
                at: date.and_time(NaiveTime::MIN),
                basis,
                date_only: true,
            });
        }
    }

    Err(EngineError::Format(format!("unparsable timestamp: {text:?}")))
}

/// Number of days in the given month (1-based), accounting for leap years.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    Some((next - first).num_days() as u32)
}

/// First and last calendar day of a month, or `None` for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)?)?;
    Some((first, last))
}

/// Last representable instant of a day (23:59:59.999999999), used for inclusive
/// day-granular bounds.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::nanoseconds(1)
}

/// Shift `anchor` by a whole number of months keeping its day-of-month and time.
///
/// Returns `None` when the day does not exist in the target month (e.g. the 31st
/// in a 30-day month, or Feb 29 outside leap years).
pub fn add_months_exact(anchor: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    let total = anchor.month0() as i64 + months as i64;
    let year = anchor.year() as i64 + total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month, anchor.day()).map(|d| d.and_time(anchor.time()))
}
