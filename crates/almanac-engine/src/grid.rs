//! Month-view grid structure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// One calendar day of a [`MonthGrid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub events: Vec<Event>,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GridCell {
    /// Padding before the first day of the month.
    Blank,
    Day(DayCell),
}

impl GridCell {
    pub fn day(&self) -> Option<&DayCell> {
        match self {
            GridCell::Blank => None,
            GridCell::Day(cell) => Some(cell),
        }
    }
}

/// A 7-column (Sunday-first) month grid: leading blanks, then one cell per day.
/// There is no trailing padding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthGrid {
    pub year: i32,
    /// 1-based month.
    pub month: u32,
    pub cells: Vec<GridCell>,
    pub total_events: usize,
}

impl MonthGrid {
    pub const COLUMNS: usize = 7;

    pub fn leading_blanks(&self) -> usize {
        self.cells
            .iter()
            .take_while(|c| matches!(c, GridCell::Blank))
            .count()
    }

    pub fn days(&self) -> impl Iterator<Item = &DayCell> {
        self.cells.iter().filter_map(GridCell::day)
    }

    /// Rows of the grid; the last row may be shorter than seven cells.
    pub fn weeks(&self) -> impl Iterator<Item = &[GridCell]> {
        self.cells.chunks(Self::COLUMNS)
    }
}
