//! Recurrence rule values and their RRULE text form.
//!
//! Supported grammar: `FREQ`, `COUNT`, `UNTIL`, `INTERVAL`, `BYDAY`, `BYMONTHDAY`,
//! `BYMONTH`, `WKST`. Any other key is kept verbatim (under its lower-cased name)
//! and written back out, so rules from newer producers survive a round-trip.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::time::{days_in_month, end_of_day, parse_timestamp, TimeBasis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(EngineError::Format(format!("unsupported FREQ: {other:?}"))),
        }
    }
}

/// Inclusive upper bound of a rule, kept in the shape it was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleUntil {
    /// `UNTIL=20261231`: bounds through the end of that day.
    Date(NaiveDate),
    /// `UNTIL=20261231T235959Z` (or without `Z` for local time).
    DateTime { at: NaiveDateTime, utc: bool },
}

impl RuleUntil {
    /// Last instant a candidate may fall on.
    pub fn bound(&self) -> NaiveDateTime {
        match self {
            RuleUntil::Date(date) => end_of_day(*date),
            RuleUntil::DateTime { at, .. } => *at,
        }
    }

    fn parse(value: &str) -> Result<Self> {
        let parsed = parse_timestamp(value)
            .map_err(|_| EngineError::Format(format!("invalid UNTIL: {value:?}")))?;
        if parsed.date_only {
            Ok(RuleUntil::Date(parsed.at.date()))
        } else {
            Ok(RuleUntil::DateTime {
                at: parsed.at,
                utc: parsed.basis == TimeBasis::Utc,
            })
        }
    }
}

impl fmt::Display for RuleUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleUntil::Date(date) => write!(f, "{}", date.format("%Y%m%d")),
            RuleUntil::DateTime { at, utc } => {
                write!(f, "{}", at.format("%Y%m%dT%H%M%S"))?;
                if *utc {
                    f.write_str("Z")?;
                }
                Ok(())
            }
        }
    }
}

/// A parsed recurrence rule. Replaced wholesale on change; the engine never
/// mutates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<RuleUntil>,
    pub by_day: Vec<Weekday>,
    /// Day-of-month filters; negative values count back from the month's end.
    pub by_month_day: Vec<i8>,
    /// 1-based month filters.
    pub by_month: Vec<u32>,
    pub wkst: Option<Weekday>,
    /// Unrecognized keys, lower-cased, with their values untouched.
    pub extensions: BTreeMap<String, String>,
}

impl RecurrenceRule {
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: 1,
            count: None,
            until: None,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
            wkst: None,
            extensions: BTreeMap::new(),
        }
    }

    pub fn daily(interval: u32, count: Option<u32>) -> Self {
        Self {
            interval,
            count,
            ..Self::new(Frequency::Daily)
        }
    }

    pub fn weekly(by_day: &[Weekday], interval: u32, count: Option<u32>) -> Self {
        Self {
            interval,
            count,
            by_day: by_day.to_vec(),
            ..Self::new(Frequency::Weekly)
        }
    }

    pub fn monthly(day_of_month: Option<i8>, interval: u32, count: Option<u32>) -> Self {
        Self {
            interval,
            count,
            by_month_day: day_of_month.into_iter().collect(),
            ..Self::new(Frequency::Monthly)
        }
    }

    pub fn yearly(interval: u32, count: Option<u32>) -> Self {
        Self {
            interval,
            count,
            ..Self::new(Frequency::Yearly)
        }
    }

    pub fn with_until(mut self, until: RuleUntil) -> Self {
        self.until = Some(until);
        self
    }

    /// AND of every present BYMONTH / BYMONTHDAY / BYDAY filter.
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        if !self.by_month.is_empty() && !self.by_month.contains(&at.month()) {
            return false;
        }
        if !self.by_month_day.is_empty() {
            let Some(len) = days_in_month(at.year(), at.month()) else {
                return false;
            };
            let day = at.day() as i32;
            let hit = self.by_month_day.iter().any(|&d| {
                let d = d as i32;
                if d > 0 {
                    d == day
                } else {
                    len as i32 + d + 1 == day
                }
            });
            if !hit {
                return false;
            }
        }
        if !self.by_day.is_empty() && !self.by_day.contains(&at.weekday()) {
            return false;
        }
        true
    }
}

impl FromStr for RecurrenceRule {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        parse_rule(s)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_rule(self))
    }
}

impl TryFrom<String> for RecurrenceRule {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        parse_rule(&value)
    }
}

impl From<RecurrenceRule> for String {
    fn from(rule: RecurrenceRule) -> Self {
        format_rule(&rule)
    }
}

/// Two-letter RRULE weekday code.
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

pub fn parse_weekday_code(code: &str) -> Result<Weekday> {
    match code.trim().to_ascii_uppercase().as_str() {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        other => Err(EngineError::Format(format!("unknown weekday code: {other:?}"))),
    }
}

/// Parse RRULE text such as `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE`.
///
/// An `RRULE:` prefix is tolerated and empty segments are skipped.
///
/// # Errors
/// Returns `EngineError::Format` when a segment is not `KEY=VALUE`, `FREQ` is
/// missing or unsupported, or a known key carries an invalid value.
pub fn parse_rule(text: &str) -> Result<RecurrenceRule> {
    let text = text.trim();
    let body = match text.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &text[6..],
        _ => text,
    };

    let mut freq = None;
    let mut rule = RecurrenceRule::new(Frequency::Daily);

    for part in body.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| EngineError::Format(format!("expected KEY=VALUE, got {part:?}")))?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() {
            return Err(EngineError::Format(format!("missing key in {part:?}")));
        }

        match key.to_ascii_uppercase().as_str() {
            "FREQ" => freq = Some(value.parse::<Frequency>()?),
            "INTERVAL" => {
                let interval = parse_number::<u32>(key, value)?;
                if interval == 0 {
                    return Err(EngineError::Format("INTERVAL must be at least 1".to_string()));
                }
                rule.interval = interval;
            }
            "COUNT" => rule.count = Some(parse_number::<u32>(key, value)?),
            "UNTIL" => rule.until = Some(RuleUntil::parse(value)?),
            "BYDAY" => {
                rule.by_day = split_list(key, value)?
                    .map(parse_weekday_code)
                    .collect::<Result<_>>()?;
            }
            "BYMONTHDAY" => {
                rule.by_month_day = split_list(key, value)?
                    .map(|v| {
                        let day = parse_number::<i8>(key, v)?;
                        if day == 0 || !(-31..=31).contains(&day) {
                            return Err(EngineError::Format(format!("BYMONTHDAY out of range: {day}")));
                        }
                        Ok(day)
                    })
                    .collect::<Result<_>>()?;
            }
            "BYMONTH" => {
                rule.by_month = split_list(key, value)?
                    .map(|v| {
                        let month = parse_number::<u32>(key, v)?;
                        if !(1..=12).contains(&month) {
                            return Err(EngineError::Format(format!("BYMONTH out of range: {month}")));
                        }
                        Ok(month)
                    })
                    .collect::<Result<_>>()?;
            }
            "WKST" => rule.wkst = Some(parse_weekday_code(value)?),
            _ => {
                rule.extensions
                    .insert(key.to_ascii_lowercase(), value.to_string());
            }
        }
    }

    rule.freq = freq.ok_or_else(|| EngineError::Format("missing FREQ".to_string()))?;
    Ok(rule)
}

/// Format a rule in canonical field order:
/// FREQ, COUNT, UNTIL, INTERVAL, BYDAY, BYMONTHDAY, BYMONTH, WKST, then extensions.
///
/// `INTERVAL=1` and absent fields are omitted.
pub fn format_rule(rule: &RecurrenceRule) -> String {
    let mut parts = vec![format!("FREQ={}", rule.freq.as_str())];

    if let Some(count) = rule.count {
        parts.push(format!("COUNT={count}"));
    }
    if let Some(until) = &rule.until {
        parts.push(format!("UNTIL={until}"));
    }
    if rule.interval != 1 {
        parts.push(format!("INTERVAL={}", rule.interval));
    }
    if !rule.by_day.is_empty() {
        let days: Vec<&str> = rule.by_day.iter().map(|d| weekday_code(*d)).collect();
        parts.push(format!("BYDAY={}", days.join(",")));
    }
    if !rule.by_month_day.is_empty() {
        parts.push(format!("BYMONTHDAY={}", join_numbers(&rule.by_month_day)));
    }
    if !rule.by_month.is_empty() {
        parts.push(format!("BYMONTH={}", join_numbers(&rule.by_month)));
    }
    if let Some(wkst) = rule.wkst {
        parts.push(format!("WKST={}", weekday_code(wkst)));
    }
    for (key, value) in &rule.extensions {
        parts.push(format!("{}={}", key.to_ascii_uppercase(), value));
    }

    parts.join(";")
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::Format(format!("{key}: not a valid number: {value:?}")))
}

fn split_list<'a>(key: &str, value: &'a str) -> Result<impl Iterator<Item = &'a str>> {
    if value.is_empty() || value.split(',').any(|v| v.trim().is_empty()) {
        return Err(EngineError::Format(format!("{key}: empty list entry in {value:?}")));
    }
    Ok(value.split(',').map(str::trim))
}

fn join_numbers<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
