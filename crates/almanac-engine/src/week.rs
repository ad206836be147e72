//! ISO-8601 week numbering.
//!
//! Weeks start on Monday and week 1 is the week holding the year's first
//! Thursday. Every date is numbered through the Thursday of its own week, so the
//! week-year can differ from the calendar year around January 1st.

use chrono::{Datelike, Duration, NaiveDate};

/// The Thursday of the ISO week containing `date`.
fn week_thursday(date: NaiveDate) -> NaiveDate {
    let from_monday = date.weekday().num_days_from_monday() as i64;
    date + Duration::days(3 - from_monday)
}

/// ISO week number (1..=53) of `date`.
pub fn week_number(date: NaiveDate) -> u32 {
    week_thursday(date).ordinal0() / 7 + 1
}

/// ISO week-year of `date`: the calendar year of its week's Thursday.
pub fn week_year(date: NaiveDate) -> i32 {
    week_thursday(date).year()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn mid_year_dates() {
        assert_eq!(week_number(d(2026, 10, 16)), 42);
        assert_eq!(week_year(d(2026, 10, 16)), 2026);
    }

    #[test]
    fn december_dates_can_belong_to_next_week_year() {
        // 2024-12-30 is a Monday whose Thursday is 2025-01-02.
        assert_eq!(week_number(d(2024, 12, 30)), 1);
        assert_eq!(week_year(d(2024, 12, 30)), 2025);
    }
}
