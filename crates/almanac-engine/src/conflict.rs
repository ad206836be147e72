//! Detect overlapping events.
//!
//! Overlap is a strict half-open test on `[start, end)`: adjacent events (where
//! one ends exactly when another starts) are NOT conflicts, and events without an
//! end never conflict with anything.

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// A detected conflict between two events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub event_a: Event,
    pub event_b: Event,
    pub overlap_minutes: i64,
}

/// Minutes shared by two events, or `None` when they do not overlap.
///
/// The overlap duration is `min(a.end, b.end) - max(a.start, b.start)`.
pub fn overlap_minutes(a: &Event, b: &Event) -> Option<i64> {
    if !a.overlaps(b) {
        return None;
    }
    let (a_end, b_end) = (a.end?, b.end?);
    let overlap_start = a.start.max(b.start);
    let overlap_end = a_end.min(b_end);
    Some((overlap_end - overlap_start).num_minutes())
}

/// Every candidate other than `event` itself (by uid) that overlaps `event`.
pub fn conflicts_with<'a>(
    event: &Event,
    candidates: impl IntoIterator<Item = &'a Event>,
) -> Vec<&'a Event> {
    candidates
        .into_iter()
        .filter(|other| other.uid != event.uid && event.overlaps(other))
        .collect()
}

/// Find all conflicting pairs within one list, each pair reported once in list order.
pub fn find_conflicting_pairs(events: &[Event]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (i, a) in events.iter().enumerate() {
        for b in &events[i + 1..] {
            if a.uid == b.uid {
                continue;
            }
            if let Some(overlap_minutes) = overlap_minutes(a, b) {
                conflicts.push(Conflict {
                    event_a: a.clone(),
                    event_b: b.clone(),
                    overlap_minutes,
                });
            }
        }
    }

    conflicts
}
