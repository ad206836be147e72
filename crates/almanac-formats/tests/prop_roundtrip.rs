//! Property-based tests: arbitrary text survives an ICS write/read cycle.

use almanac_engine::Event;
use almanac_formats::{parse_calendar, parse_events, write_calendar, write_events};
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

fn arb_start() -> impl Strategy<Value = NaiveDateTime> {
    (2000i32..=2040, 1u32..=12, 1u32..=28, 0u32..=23, 0u32..=59).prop_map(|(y, m, d, h, min)| {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    })
}

/// Printable text including the characters that need escaping.
fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,;:\\\\\n\"'éß日本-]{1,120}"
        .prop_filter("non-blank, no edge whitespace", |s| {
            !s.trim().is_empty() && s.trim() == s
        })
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn ics_preserves_text_fields(
        title in arb_text(),
        description in arb_text(),
        location in arb_text(),
        start in arb_start(),
    ) {
        let mut event = Event::new("prop-uid", title, start);
        event.description = Some(description);
        event.location = Some(location);

        let written = write_calendar(std::slice::from_ref(&event));
        let reread = parse_calendar(&written).unwrap();
        prop_assert_eq!(reread.len(), 1);
        prop_assert_eq!(&reread[0], &event);
    }

    #[test]
    fn json_preserves_events(
        title in arb_text(),
        start in arb_start(),
        minutes in 0i64..=600,
    ) {
        let event = Event::new("prop-uid", title, start)
            .with_end(start + chrono::Duration::minutes(minutes));

        let written = write_events(std::slice::from_ref(&event)).unwrap();
        let reread = parse_events(&written).unwrap();
        prop_assert_eq!(reread, vec![event]);
    }
}
