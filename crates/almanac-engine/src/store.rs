//! In-memory event collection and its queries.
//!
//! The store keeps events in insertion order and never deduplicates: a repeated
//! uid is kept (and logged), and uid lookups return the first match. Every query
//! returns a freshly built `Vec`, so callers can mutate results without touching
//! the store.

use std::collections::{BTreeSet, HashSet};

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::conflict::conflicts_with;
use crate::error::{EngineError, Result};
use crate::event::{Event, Occurrence};
use crate::expander::{occurrences, ExpandOptions};
use crate::freebusy::{BusyPolicy, FreeBusy, FreeSlot};
use crate::grid::{DayCell, GridCell, MonthGrid};
use crate::time::{end_of_day, month_bounds};

#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut store = Self::new();
        store.insert(events);
        store
    }

    /// Append events in order. Returns how many were added.
    pub fn insert(&mut self, events: impl IntoIterator<Item = Event>) -> usize {
        let before = self.events.len();
        let mut seen: HashSet<String> = self.events.iter().map(|e| e.uid.clone()).collect();
        for event in events {
            if !seen.insert(event.uid.clone()) {
                warn!(uid = %event.uid, "inserting event with an existing uid");
            }
            self.events.push(event);
        }
        let added = self.events.len() - before;
        debug!(added, total = self.events.len(), "events inserted");
        added
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// First event with this uid.
    pub fn get(&self, uid: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.uid == uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| e.uid == uid)
    }

    /// Remove every event with this uid. Returns whether anything was removed.
    pub fn remove(&mut self, uid: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.uid != uid);
        self.events.len() != before
    }

    /// Remove every event whose uid is listed. Returns the number removed.
    pub fn remove_many(&mut self, uids: &[&str]) -> usize {
        let before = self.events.len();
        self.events.retain(|e| !uids.contains(&e.uid.as_str()));
        before - self.events.len()
    }

    /// Events starting on `date`; time of day is ignored.
    pub fn by_date(&self, date: NaiveDate) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| e.start.date() == date)
            .cloned()
            .collect()
    }

    /// Events with `start` in `[start, end]`, ascending by start. Ties keep store order.
    pub fn by_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<Event> {
        let mut found: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.start >= start && e.start <= end)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.start);
        found
    }

    /// Events starting anywhere within a month (1-based), through the end of its last day.
    pub fn by_month(&self, year: i32, month: u32) -> Result<Vec<Event>> {
        let (first, last) = month_bounds(year, month)
            .ok_or_else(|| EngineError::Argument(format!("invalid month: {year}-{month}")))?;
        Ok(self.by_range(first.and_time(NaiveTime::MIN), end_of_day(last)))
    }

    /// Month grid flagged against today's local date.
    pub fn month_grid(&self, year: i32, month: u32) -> Result<MonthGrid> {
        self.month_grid_at(year, month, Local::now().date_naive())
    }

    /// Month grid with an explicit "today".
    ///
    /// Leading blanks equal the Sunday-based weekday index of day 1.
    pub fn month_grid_at(&self, year: i32, month: u32, today: NaiveDate) -> Result<MonthGrid> {
        let (first, last) = month_bounds(year, month)
            .ok_or_else(|| EngineError::Argument(format!("invalid month: {year}-{month}")))?;

        let leading = first.weekday().num_days_from_sunday() as usize;
        let mut cells: Vec<GridCell> = Vec::with_capacity(leading + last.day() as usize);
        cells.extend(std::iter::repeat_n(GridCell::Blank, leading));

        let mut total_events = 0;
        for date in first.iter_days().take_while(|d| *d <= last) {
            let events = self.by_date(date);
            total_events += events.len();
            cells.push(GridCell::Day(DayCell {
                date,
                events,
                is_today: date == today,
            }));
        }

        Ok(MonthGrid {
            year,
            month,
            cells,
            total_events,
        })
    }

    /// Case-insensitive substring search over title, description, and location.
    pub fn search(&self, query: &str) -> Vec<Event> {
        let needle = query.to_lowercase();
        let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
        self.events
            .iter()
            .filter(|e| {
                hit(Some(e.title.as_str())) || hit(e.description.as_deref()) || hit(e.location.as_deref())
            })
            .cloned()
            .collect()
    }

    /// Stored events, other than `event` itself, whose `[start, end)` overlaps it.
    pub fn conflicts(&self, event: &Event) -> Vec<Event> {
        conflicts_with(event, &self.events)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Events carrying any of `categories` (case-insensitive).
    pub fn filter_by_category(&self, categories: &[&str]) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| categories.iter().any(|c| e.has_category(c)))
            .cloned()
            .collect()
    }

    /// Every category in use, deduplicated and sorted.
    pub fn all_categories(&self) -> Vec<String> {
        self.events
            .iter()
            .flat_map(|e| e.categories.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Events with a priority in `[min, max]`, ascending by priority.
    pub fn by_priority_range(&self, min: u8, max: u8) -> Vec<Event> {
        let mut found: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.priority.is_some_and(|p| p >= min && p <= max))
            .cloned()
            .collect();
        found.sort_by_key(|e| e.priority);
        found
    }

    /// Events whose status equals `status`, ignoring case.
    pub fn by_status(&self, status: &str) -> Vec<Event> {
        let status = status.trim();
        self.events
            .iter()
            .filter(|e| e.status.is_some_and(|s| s.as_str().eq_ignore_ascii_case(status)))
            .cloned()
            .collect()
    }

    /// Expand every stored event into the window and merge the results by start.
    pub fn occurrences_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        options: ExpandOptions,
    ) -> Vec<Occurrence> {
        let mut found: Vec<Occurrence> = self
            .events
            .iter()
            .flat_map(|e| occurrences(e, Some(start), Some(end), options))
            .filter(|o| o.start() <= end && (o.start() >= start || o.end().is_some_and(|e| e > start)))
            .collect();
        found.sort_by_key(|o| o.start());
        found
    }

    /// Busy blocks and free slots of the window, with recurring events expanded.
    pub fn free_busy(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        options: ExpandOptions,
        policy: BusyPolicy,
    ) -> FreeBusy {
        let found = self.occurrences_in_range(window_start, window_end, options);
        FreeBusy::compute(&found, window_start, window_end, policy)
    }

    /// Free slots in the window under the default [`BusyPolicy`].
    pub fn free_slots(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        options: ExpandOptions,
    ) -> Vec<FreeSlot> {
        self.free_busy(window_start, window_end, options, BusyPolicy::default())
            .free
    }

    pub fn first_free_slot(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        min_duration_minutes: i64,
        options: ExpandOptions,
    ) -> Option<FreeSlot> {
        self.free_busy(window_start, window_end, options, BusyPolicy::default())
            .first_fit(min_duration_minutes)
            .cloned()
    }
}

impl<'a> IntoIterator for &'a EventStore {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
