//! Free/busy view of a window of occurrences.
//!
//! Each occurrence contributes at most one busy span, decided by [`BusyPolicy`]:
//! cancelled events never block, all-day events block their whole span only when
//! asked to, and events without an end block a configurable number of minutes.
//! Spans that touch or overlap fold into one [`BusyBlock`] that remembers which
//! occurrences produced it. Free slots are whatever the blocks leave uncovered.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::event::{EventStatus, Occurrence};
use crate::time::end_of_day;

/// How occurrences translate into busy time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusyPolicy {
    /// All-day occurrences block from their start to their end, or to the end
    /// of their day when they have no end.
    pub all_day_blocks: bool,
    /// Busy minutes for a timed occurrence without an end. Zero means none.
    pub open_ended_minutes: i64,
    /// Cancelled occurrences block like any other.
    pub include_cancelled: bool,
}

impl BusyPolicy {
    pub fn with_all_day_blocks(mut self, all_day_blocks: bool) -> Self {
        self.all_day_blocks = all_day_blocks;
        self
    }

    pub fn with_open_ended_minutes(mut self, minutes: i64) -> Self {
        self.open_ended_minutes = minutes.max(0);
        self
    }

    /// The `[start, end)` span `occurrence` keeps busy, if any.
    pub fn busy_span(&self, occurrence: &Occurrence) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let event = &occurrence.event;
        if !self.include_cancelled && event.status == Some(EventStatus::Cancelled) {
            return None;
        }

        let start = occurrence.start();
        let end = if event.is_all_day {
            if !self.all_day_blocks {
                return None;
            }
            occurrence
                .end()
                .unwrap_or_else(|| end_of_day(start.date()) + Duration::nanoseconds(1))
        } else {
            match occurrence.end() {
                Some(end) => end,
                None if self.open_ended_minutes > 0 => {
                    start + Duration::minutes(self.open_ended_minutes)
                }
                None => return None,
            }
        };

        (end > start).then_some((start, end))
    }
}

/// A maximal stretch of busy time and the occurrences behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyBlock {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Occurrence uids in order of their start.
    pub uids: Vec<String>,
}

/// A free time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: i64,
}

impl FreeSlot {
    fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
        }
    }
}

/// Busy blocks and free slots partitioning a window, both sorted by start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBusy {
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub busy: Vec<BusyBlock>,
    pub free: Vec<FreeSlot>,
}

impl FreeBusy {
    /// Partition `[window_start, window_end)` according to `policy`.
    pub fn compute(
        occurrences: &[Occurrence],
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        policy: BusyPolicy,
    ) -> Self {
        let mut spans: Vec<(NaiveDateTime, NaiveDateTime, &str)> = occurrences
            .iter()
            .filter_map(|o| {
                let (start, end) = policy.busy_span(o)?;
                (start < window_end && end > window_start).then(|| {
                    (start.max(window_start), end.min(window_end), o.uid())
                })
            })
            .collect();
        spans.sort_by_key(|&(start, end, _)| (start, end));

        let mut busy: Vec<BusyBlock> = Vec::new();
        for (start, end, uid) in spans {
            match busy.last_mut() {
                Some(block) if start <= block.end => {
                    block.end = block.end.max(end);
                    block.uids.push(uid.to_string());
                }
                _ => busy.push(BusyBlock {
                    start,
                    end,
                    uids: vec![uid.to_string()],
                }),
            }
        }

        let mut free = Vec::new();
        let mut cursor = window_start;
        for block in &busy {
            if cursor < block.start {
                free.push(FreeSlot::new(cursor, block.start));
            }
            cursor = block.end;
        }
        if cursor < window_end {
            free.push(FreeSlot::new(cursor, window_end));
        }

        Self {
            window_start,
            window_end,
            busy,
            free,
        }
    }

    /// First free slot lasting at least `min_minutes`.
    pub fn first_fit(&self, min_minutes: i64) -> Option<&FreeSlot> {
        self.free.iter().find(|slot| slot.duration_minutes >= min_minutes)
    }

    pub fn busy_minutes(&self) -> i64 {
        self.busy.iter().map(|b| (b.end - b.start).num_minutes()).sum()
    }
}

/// Free slots in the window under the default [`BusyPolicy`].
pub fn find_free_slots(
    occurrences: &[Occurrence],
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Vec<FreeSlot> {
    FreeBusy::compute(occurrences, window_start, window_end, BusyPolicy::default()).free
}
