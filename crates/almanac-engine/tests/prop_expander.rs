//! Property-based tests for recurrence expansion using proptest.
//!
//! These tests verify invariants that should hold for *any* valid rule input,
//! not just the specific examples in `expander_tests.rs`.

use almanac_engine::{
    expand_occurrences, format_rule, parse_rule, week_number, week_year, Event, ExpandOptions,
    Frequency, RecurrenceRule,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_freq() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Daily),
        Just(Frequency::Weekly),
        Just(Frequency::Monthly),
        Just(Frequency::Yearly),
    ]
}

fn arb_interval() -> impl Strategy<Value = u32> {
    1u32..=12
}

fn arb_count() -> impl Strategy<Value = u32> {
    1u32..=50
}

fn arb_weekday() -> impl Strategy<Value = Weekday> {
    prop_oneof![
        Just(Weekday::Mon),
        Just(Weekday::Tue),
        Just(Weekday::Wed),
        Just(Weekday::Thu),
        Just(Weekday::Fri),
        Just(Weekday::Sat),
        Just(Weekday::Sun),
    ]
}

/// A start in the 2025-2027 range. Day is capped at 28 so every month has it.
fn arb_start() -> impl Strategy<Value = NaiveDateTime> {
    (2025i32..=2027, 1u32..=12, 1u32..=28, 0u32..=23, 0u32..=59).prop_map(|(y, m, d, h, min)| {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    })
}

fn arb_duration() -> impl Strategy<Value = i64> {
    15i64..=120
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..=2060, 1u32..=366).prop_filter_map("day of year exists", |(y, ordinal)| {
        NaiveDate::from_yo_opt(y, ordinal)
    })
}

fn event(start: NaiveDateTime, minutes: i64, rule: RecurrenceRule) -> Event {
    Event::new("prop", "Prop", start)
        .with_end(start + Duration::minutes(minutes))
        .with_rule(rule)
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Property 1: Expansion result is sorted and free of duplicates
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn expansion_is_strictly_increasing(
        freq in arb_freq(),
        interval in arb_interval(),
        count in arb_count(),
        start in arb_start(),
        dur in arb_duration(),
    ) {
        let mut rule = RecurrenceRule::new(freq);
        rule.interval = interval;
        rule.count = Some(count);
        let occurrences = expand_occurrences(&event(start, dur, rule), None, None, ExpandOptions::default());

        for window in occurrences.windows(2) {
            prop_assert!(
                window[0].start() < window[1].start(),
                "occurrences not strictly increasing: {:?} then {:?}",
                window[0].start(),
                window[1].start()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Property 2: COUNT respected when every step lands on an existing day
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn count_respected(
        freq in arb_freq(),
        interval in 1u32..=3,
        count in arb_count(),
        start in arb_start(),
        dur in arb_duration(),
    ) {
        let mut rule = RecurrenceRule::new(freq);
        rule.interval = interval;
        rule.count = Some(count);
        let occurrences = expand_occurrences(&event(start, dur, rule), None, None, ExpandOptions::default());

        prop_assert_eq!(occurrences.len(), count as usize);
        prop_assert_eq!(occurrences[0].start(), start);
    }
}

// ---------------------------------------------------------------------------
// Property 3: Duration preserved on every occurrence
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn duration_preserved(
        freq in arb_freq(),
        count in arb_count(),
        start in arb_start(),
        dur in arb_duration(),
    ) {
        let mut rule = RecurrenceRule::new(freq);
        rule.count = Some(count);
        let occurrences = expand_occurrences(&event(start, dur, rule), None, None, ExpandOptions::default());

        let expected = Duration::minutes(dur);
        for occ in &occurrences {
            prop_assert_eq!(occ.end().map(|end| end - occ.start()), Some(expected));
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: DAILY spacing is exactly INTERVAL days
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn daily_interval_spacing(
        interval in arb_interval(),
        count in 2u32..=30,
        start in arb_start(),
        dur in arb_duration(),
    ) {
        let rule = RecurrenceRule::daily(interval, Some(count));
        let occurrences = expand_occurrences(&event(start, dur, rule), None, None, ExpandOptions::default());

        prop_assert_eq!(occurrences.len(), count as usize);
        let expected_gap = Duration::days(interval as i64);
        for window in occurrences.windows(2) {
            prop_assert_eq!(window[1].start() - window[0].start(), expected_gap);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 5: Window queries never emit occurrences that end before the window
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn window_lower_bound_respected(
        start in arb_start(),
        dur in arb_duration(),
        offset_days in 0i64..=60,
        span_days in 1i64..=30,
    ) {
        let rule = RecurrenceRule::daily(1, None);
        let range_start = start + Duration::days(offset_days);
        let range_end = range_start + Duration::days(span_days);
        let occurrences = expand_occurrences(
            &event(start, dur, rule),
            Some(range_start),
            Some(range_end),
            ExpandOptions::default(),
        );

        prop_assert!(!occurrences.is_empty());
        for occ in &occurrences {
            prop_assert!(occ.start() <= range_end);
            prop_assert!(
                occ.start() >= range_start || occ.end().is_some_and(|end| end > range_start),
                "occurrence {:?} lies entirely before {:?}",
                occ.start(),
                range_start
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Property 6: BYDAY filters only ever emit listed weekdays
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn byday_filter_emits_listed_weekdays(
        day in arb_weekday(),
        start in arb_start(),
        dur in arb_duration(),
    ) {
        let mut rule = RecurrenceRule::daily(1, None);
        rule.by_day = vec![day];
        let range_end = start + Duration::days(60);
        let occurrences = expand_occurrences(
            &event(start, dur, rule),
            None,
            Some(range_end),
            ExpandOptions::default(),
        );

        prop_assert!(occurrences.len() >= 8);
        for occ in &occurrences {
            prop_assert_eq!(occ.start().weekday(), day);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 7: format_rule output parses back to the same rule
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn formatted_rules_parse_back(
        freq in arb_freq(),
        interval in arb_interval(),
        count in proptest::option::of(arb_count()),
        days in proptest::collection::vec(arb_weekday(), 0..3),
        month_day in proptest::option::of(prop_oneof![1i8..=31, -31i8..=-1]),
        month in proptest::option::of(1u32..=12),
    ) {
        let mut rule = RecurrenceRule::new(freq);
        rule.interval = interval;
        rule.count = count;
        rule.by_day = days;
        rule.by_month_day = month_day.into_iter().collect();
        rule.by_month = month.into_iter().collect();

        let text = format_rule(&rule);
        let reparsed = parse_rule(&text).unwrap();
        prop_assert_eq!(reparsed, rule);
    }
}

// ---------------------------------------------------------------------------
// Property 8: ISO week numbering agrees with chrono's own IsoWeek
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn week_numbering_matches_iso_week(date in arb_date()) {
        let iso = date.iso_week();
        prop_assert_eq!(week_number(date), iso.week());
        prop_assert_eq!(week_year(date), iso.year());
    }
}
