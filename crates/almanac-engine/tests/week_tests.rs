//! ISO week numbering around year boundaries.

use almanac_engine::{week_number, week_year};
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn january_first_on_friday_belongs_to_previous_week_year() {
    // 2021-01-01 is a Friday.
    assert_eq!(week_number(d(2021, 1, 1)), 53);
    assert_eq!(week_year(d(2021, 1, 1)), 2020);
    assert_eq!(week_number(d(2021, 1, 4)), 1);
    assert_eq!(week_year(d(2021, 1, 4)), 2021);
}

#[test]
fn january_first_on_saturday_and_sunday() {
    // 2022-01-01 is a Saturday, 2023-01-01 a Sunday.
    assert_eq!((week_number(d(2022, 1, 1)), week_year(d(2022, 1, 1))), (52, 2021));
    assert_eq!((week_number(d(2023, 1, 1)), week_year(d(2023, 1, 1))), (52, 2022));
}

#[test]
fn january_first_on_thursday_is_week_one() {
    // 2026-01-01 is a Thursday.
    assert_eq!(week_number(d(2026, 1, 1)), 1);
    assert_eq!(week_year(d(2026, 1, 1)), 2026);
    // The Monday before it is in week 1 as well.
    assert_eq!(week_number(d(2025, 12, 29)), 1);
    assert_eq!(week_year(d(2025, 12, 29)), 2026);
}

#[test]
fn long_years_have_week_fifty_three() {
    assert_eq!(week_number(d(2026, 12, 31)), 53);
    assert_eq!(week_year(d(2026, 12, 31)), 2026);
    assert_eq!(week_number(d(2027, 1, 3)), 53);
    assert_eq!(week_year(d(2027, 1, 3)), 2026);
}
