//! Recurrence expansion -- projects an event's rule onto concrete occurrences.
//!
//! The walk starts at the event's own start and steps a candidate forward by the
//! rule's frequency and interval. Month and year steps are taken from the anchor
//! (`anchor + n * interval`), so a candidate whose day does not exist in the target
//! month (the 31st in April, Feb 29 in a common year) is skipped rather than rolled
//! into the following month, and later candidates keep the anchor's day.
//!
//! Stop conditions, checked on every step:
//!
//! - the candidate passes the rule's `UNTIL` bound
//! - `COUNT` matching candidates have been seen (counted from the anchor)
//! - `max_occurrences` occurrences have been emitted
//! - the candidate passes the end of the query window
//! - the walk stalls (a step fails to move the candidate forward) or exceeds
//!   `max_steps`

use chrono::{Datelike, Duration, NaiveDateTime};
use tracing::{debug, warn};

use crate::event::{Event, Occurrence};
use crate::rule::{parse_rule, Frequency, RecurrenceRule};
use crate::time::add_months_exact;

/// Default cap on occurrences emitted by one expansion (two years of dailies).
pub const DEFAULT_MAX_OCCURRENCES: usize = 730;

/// Default ceiling on candidate steps walked by one expansion.
pub const DEFAULT_MAX_STEPS: usize = 100_000;

/// Limits applied to a single expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    pub max_occurrences: usize,
    pub max_steps: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl ExpandOptions {
    pub fn with_max_occurrences(mut self, max_occurrences: usize) -> Self {
        self.max_occurrences = max_occurrences;
        self
    }
}

/// Expand `event` into the occurrences that can overlap `[range_start, range_end]`.
///
/// `None` bounds are unbounded. An event without a rule yields exactly one
/// occurrence: itself.
///
/// # Arguments
/// - `event` -- the template event; its start is the first candidate
/// - `range_start` -- lower window edge, widened backward by the event's duration
/// - `range_end` -- inclusive upper window edge for occurrence starts
/// - `options` -- occurrence cap and step ceiling
pub fn expand_occurrences(
    event: &Event,
    range_start: Option<NaiveDateTime>,
    range_end: Option<NaiveDateTime>,
    options: ExpandOptions,
) -> Vec<Occurrence> {
    occurrences(event, range_start, range_end, options).collect()
}

/// Lazy, restartable form of [`expand_occurrences`]. Cloning the iterator before
/// consuming it replays the same sequence.
pub fn occurrences(
    event: &Event,
    range_start: Option<NaiveDateTime>,
    range_end: Option<NaiveDateTime>,
    options: ExpandOptions,
) -> Occurrences<'_> {
    Occurrences::new(event, event.recurrence_rule.as_ref(), range_start, range_end, options)
}

/// Expand `event` using rule text instead of its stored rule.
///
/// Unparsable text never fails the expansion: it is logged and the event is
/// treated as a single non-recurring occurrence.
pub fn expand_rule_text(
    event: &Event,
    rule_text: &str,
    range_start: Option<NaiveDateTime>,
    range_end: Option<NaiveDateTime>,
    options: ExpandOptions,
) -> Vec<Occurrence> {
    match parse_rule(rule_text) {
        Ok(rule) => Occurrences::new(event, Some(&rule), range_start, range_end, options).collect(),
        Err(e) => {
            warn!(uid = %event.uid, error = %e, "unusable recurrence rule, expanding as single event");
            vec![Occurrence::single(event.clone())]
        }
    }
}

/// Outcome of computing the n-th candidate from the anchor.
enum Step {
    At(NaiveDateTime),
    /// The anchor's day does not exist in the target month.
    Missing,
    /// Date arithmetic overflowed.
    Exhausted,
}

fn candidate_at(anchor: NaiveDateTime, rule: &RecurrenceRule, n: u32) -> Step {
    let Some(units) = n.checked_mul(rule.interval) else {
        return Step::Exhausted;
    };
    let shifted = match rule.freq {
        Frequency::Daily => Duration::try_days(units as i64).and_then(|d| anchor.checked_add_signed(d)),
        Frequency::Weekly => {
            Duration::try_weeks(units as i64).and_then(|d| anchor.checked_add_signed(d))
        }
        Frequency::Monthly => return month_step(anchor, Some(units)),
        Frequency::Yearly => return month_step(anchor, units.checked_mul(12)),
    };
    match shifted {
        Some(at) => Step::At(at),
        None => Step::Exhausted,
    }
}

fn month_step(anchor: NaiveDateTime, months: Option<u32>) -> Step {
    let Some(months) = months else {
        return Step::Exhausted;
    };
    if let Some(at) = add_months_exact(anchor, months) {
        return Step::At(at);
    }
    // The first of the month always exists, so failing there means overflow.
    match anchor.with_day(1).and_then(|first| add_months_exact(first, months)) {
        Some(_) => Step::Missing,
        None => Step::Exhausted,
    }
}

/// Iterator over the occurrences of one event. See [`occurrences`].
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    event: &'a Event,
    rule: Option<RecurrenceRule>,
    duration: Option<Duration>,
    range_start: Option<NaiveDateTime>,
    range_end: Option<NaiveDateTime>,
    until: Option<NaiveDateTime>,
    options: ExpandOptions,
    index: u32,
    steps: usize,
    matched: u32,
    emitted: usize,
    last_candidate: Option<NaiveDateTime>,
    done: bool,
}

impl<'a> Occurrences<'a> {
    fn new(
        event: &'a Event,
        rule: Option<&RecurrenceRule>,
        range_start: Option<NaiveDateTime>,
        range_end: Option<NaiveDateTime>,
        options: ExpandOptions,
    ) -> Self {
        Self {
            event,
            rule: rule.cloned(),
            duration: event.duration(),
            range_start,
            range_end,
            until: rule.and_then(|r| r.until).map(|u| u.bound()),
            options,
            index: 0,
            steps: 0,
            matched: 0,
            emitted: 0,
            last_candidate: None,
            done: false,
        }
    }

    fn finish(&mut self, reason: &'static str) -> Option<Occurrence> {
        debug!(
            uid = %self.event.uid,
            reason,
            steps = self.steps,
            emitted = self.emitted,
            "recurrence walk finished"
        );
        self.done = true;
        None
    }

    /// Whether `[start, start + duration)` can overlap the window's lower edge.
    fn reaches_window(&self, start: NaiveDateTime) -> bool {
        let Some(lower) = self.range_start else {
            return true;
        };
        if start >= lower {
            return true;
        }
        match self.duration {
            Some(d) if d > Duration::zero() => start + d > lower,
            _ => false,
        }
    }

    fn project(&self, start: NaiveDateTime) -> Occurrence {
        let mut event = self.event.clone();
        event.uid = format!("{}-{}", self.event.uid, start.format("%Y%m%d"));
        event.start = start;
        event.end = self.duration.map(|d| start + d);
        Occurrence {
            event,
            is_recurring: true,
            recurring_event_id: Some(self.event.uid.clone()),
            occurrence_date: start.date(),
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self.done {
            return None;
        }
        let Some(rule) = self.rule.as_ref() else {
            self.done = true;
            return Some(Occurrence::single(self.event.clone()));
        };

        loop {
            if rule.count.is_some_and(|c| self.matched >= c) {
                return self.finish("count");
            }
            if self.emitted >= self.options.max_occurrences {
                return self.finish("max_occurrences");
            }
            if self.steps >= self.options.max_steps {
                return self.finish("max_steps");
            }

            let n = self.index;
            self.index = self.index.saturating_add(1);
            self.steps += 1;

            let candidate = match candidate_at(self.event.start, rule, n) {
                Step::At(at) => at,
                Step::Missing => continue,
                Step::Exhausted => return self.finish("overflow"),
            };

            if self.last_candidate.is_some_and(|prev| candidate <= prev) {
                return self.finish("stalled");
            }
            self.last_candidate = Some(candidate);

            if self.until.is_some_and(|until| candidate > until) {
                return self.finish("until");
            }
            if self.range_end.is_some_and(|end| candidate > end) {
                return self.finish("range_end");
            }
            if !rule.matches(candidate) {
                continue;
            }

            self.matched += 1;
            if self.reaches_window(candidate) {
                self.emitted += 1;
                return Some(self.project(candidate));
            }
        }
    }
}
