//! Integration tests for the iCalendar adapter.

use almanac_engine::{EventStatus, Frequency, TimeBasis};
use almanac_formats::{parse_calendar, write_calendar};
use chrono::{NaiveDate, NaiveDateTime};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn calendar(body: &str) -> String {
    format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n{body}END:VCALENDAR\r\n")
}

const FULL_EVENT: &str = "BEGIN:VEVENT\r\n\
UID:review-1@example.com\r\n\
SUMMARY:Design review\\, round 2\r\n\
DESCRIPTION:Agenda:\\n1. Layout\\n2. Colors\\; fonts\r\n\
LOCATION:Room 4\\\\B\r\n\
DTSTART:20260302T140000Z\r\n\
DTEND:20260302T153000Z\r\n\
CATEGORIES:Work,Design\r\n\
CATEGORIES:Review\r\n\
PRIORITY:2\r\n\
STATUS:TENTATIVE\r\n\
COLOR:#3366ff\r\n\
ATTACH:https://example.com/deck.pdf\r\n\
ORGANIZER;CN=Ana Ruiz:mailto:ana@example.com\r\n\
ATTENDEE;CN=\"Lee, Sam\";ROLE=REQ-PARTICIPANT;PARTSTAT=ACCEPTED;RSVP=TRUE:MAILTO:sam@example.com\r\n\
ATTENDEE;PARTSTAT=NEEDS-ACTION:mailto:kim@example.com\r\n\
RRULE:FREQ=WEEKLY;COUNT=3;BYDAY=MO\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
DESCRIPTION:Reminder text that must not leak\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n";

#[test]
fn parses_every_supported_property() {
    let events = parse_calendar(&calendar(FULL_EVENT)).unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];

    assert_eq!(event.uid, "review-1@example.com");
    assert_eq!(event.title, "Design review, round 2");
    assert_eq!(
        event.description.as_deref(),
        Some("Agenda:\n1. Layout\n2. Colors; fonts")
    );
    assert_eq!(event.location.as_deref(), Some("Room 4\\B"));
    assert_eq!(event.start, at(2026, 3, 2, 14, 0));
    assert_eq!(event.end, Some(at(2026, 3, 2, 15, 30)));
    assert_eq!(event.time_basis, TimeBasis::Utc);
    assert!(!event.is_all_day);
    assert_eq!(
        event.categories.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["Design", "Review", "Work"]
    );
    assert_eq!(event.priority, Some(2));
    assert_eq!(event.status, Some(EventStatus::Tentative));
    assert_eq!(event.color.as_deref(), Some("#3366ff"));
    assert_eq!(event.attachments, vec!["https://example.com/deck.pdf"]);

    let organizer = event.organizer.as_ref().unwrap();
    assert_eq!(organizer.name.as_deref(), Some("Ana Ruiz"));
    assert_eq!(organizer.email, "ana@example.com");

    assert_eq!(event.attendees.len(), 2);
    let sam = &event.attendees[0];
    assert_eq!(sam.name.as_deref(), Some("Lee, Sam"));
    assert_eq!(sam.email, "sam@example.com");
    assert_eq!(sam.role.as_deref(), Some("REQ-PARTICIPANT"));
    assert_eq!(sam.status.as_deref(), Some("ACCEPTED"));
    assert!(sam.rsvp);
    assert!(!event.attendees[1].rsvp);

    let rule = event.recurrence_rule.as_ref().unwrap();
    assert_eq!(rule.freq, Frequency::Weekly);
    assert_eq!(rule.count, Some(3));
}

#[test]
fn folded_lines_are_joined() {
    let body = "BEGIN:VEVENT\r\n\
UID:fold\r\n\
SUMMARY:A very long summary that was folded by\r\n  the producing application\r\n\
DTSTART:20260302T090000\r\n\
END:VEVENT\r\n";
    let events = parse_calendar(&calendar(body)).unwrap();
    assert_eq!(
        events[0].title,
        "A very long summary that was folded by the producing application"
    );
}

#[test]
fn date_only_start_is_all_day_and_local() {
    let body = "BEGIN:VEVENT\r\n\
UID:holiday\r\n\
SUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20261225\r\n\
DTEND;VALUE=DATE:20261226\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:bare-date\r\n\
SUMMARY:Bare date\r\n\
DTSTART:20261231\r\n\
END:VEVENT\r\n";
    let events = parse_calendar(&calendar(body)).unwrap();

    assert_eq!(events.len(), 2);
    assert!(events[0].is_all_day);
    assert_eq!(events[0].start, at(2026, 12, 25, 0, 0));
    assert_eq!(events[0].end, Some(at(2026, 12, 26, 0, 0)));
    assert_eq!(events[0].time_basis, TimeBasis::Local);
    assert!(events[1].is_all_day);
}

#[test]
fn tzid_and_floating_times_stay_local() {
    let body = "BEGIN:VEVENT\r\n\
UID:ny\r\n\
SUMMARY:NY call\r\n\
DTSTART;TZID=America/New_York:20260302T090000\r\n\
END:VEVENT\r\n";
    let events = parse_calendar(&calendar(body)).unwrap();
    assert_eq!(events[0].start, at(2026, 3, 2, 9, 0));
    assert_eq!(events[0].time_basis, TimeBasis::Local);
}

#[test]
fn events_without_start_are_dropped_and_titles_defaulted() {
    let body = "BEGIN:VEVENT\r\n\
UID:no-start\r\n\
SUMMARY:Nothing to anchor\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:no-title\r\n\
DTSTART:20260302T090000\r\n\
END:VEVENT\r\n";
    let events = parse_calendar(&calendar(body)).unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].uid, "no-title");
    assert_eq!(events[0].title, "Untitled Event");
}

#[test]
fn bad_rrule_priority_and_status_are_ignored() {
    let body = "BEGIN:VEVENT\r\n\
UID:messy\r\n\
SUMMARY:Messy\r\n\
DTSTART:20260302T090000\r\n\
PRIORITY:0\r\n\
STATUS:MAYBE\r\n\
RRULE:COUNT=3\r\n\
END:VEVENT\r\n";
    let event = &parse_calendar(&calendar(body)).unwrap()[0];

    assert_eq!(event.priority, None);
    assert_eq!(event.status, None);
    assert!(event.recurrence_rule.is_none());
}

#[test]
fn uids_are_unique_within_one_parse() {
    let one = "BEGIN:VEVENT\r\nUID:dup\r\nSUMMARY:One\r\nDTSTART:20260302T090000\r\nEND:VEVENT\r\n";
    let two = "BEGIN:VEVENT\r\nUID:dup\r\nSUMMARY:Two\r\nDTSTART:20260303T090000\r\nEND:VEVENT\r\n";
    let anon = "BEGIN:VEVENT\r\nSUMMARY:Anon\r\nDTSTART:20260304T090000\r\nEND:VEVENT\r\n";
    let events = parse_calendar(&calendar(&format!("{one}{two}{anon}{anon}"))).unwrap();

    let uids: Vec<&str> = events.iter().map(|e| e.uid.as_str()).collect();
    assert_eq!(&uids[..2], &["dup", "dup-2"]);
    assert!(uids[2].ends_with("@almanac"));
    assert_ne!(uids[2], uids[3]);
}

#[test]
fn written_calendar_reads_back() {
    let original = parse_calendar(&calendar(FULL_EVENT)).unwrap();
    let written = write_calendar(&original);

    assert!(written.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(written.contains("PRODID:-//almanac//almanac-formats//EN\r\n"));
    assert!(!written.contains("CALSCALE"));
    assert!(written.ends_with("END:VCALENDAR\r\n"));
    assert!(written.contains("SUMMARY:Design review\\, round 2\r\n"));
    assert!(written.contains("DTSTART:20260302T140000Z\r\n"));
    assert!(written.contains("RRULE:FREQ=WEEKLY;COUNT=3;BYDAY=MO\r\n"));
    assert_eq!(written.matches("ATTENDEE").count(), 2);

    let reread = parse_calendar(&written).unwrap();
    assert_eq!(reread, original);
}

#[test]
fn all_day_events_write_value_date() {
    let body = "BEGIN:VEVENT\r\nUID:h\r\nSUMMARY:H\r\nDTSTART;VALUE=DATE:20261225\r\nEND:VEVENT\r\n";
    let written = write_calendar(&parse_calendar(&calendar(body)).unwrap());
    assert!(written.contains("DTSTART;VALUE=DATE:20261225\r\n"));
}

#[test]
fn long_lines_are_folded() {
    let body = format!(
        "BEGIN:VEVENT\r\nUID:long\r\nSUMMARY:{}\r\nDTSTART:20260302T090000\r\nEND:VEVENT\r\n",
        "word ".repeat(40).trim_end()
    );
    let events = parse_calendar(&calendar(&body)).unwrap();
    let written = write_calendar(&events);

    assert!(written.contains("\r\n "));
    assert_eq!(parse_calendar(&written).unwrap()[0].title, events[0].title);
}

#[test]
fn unreadable_calendar_is_an_error() {
    assert!(matches!(
        parse_calendar("this is not a calendar"),
        Err(almanac_formats::FormatError::Ics(_))
    ));
}

#[test]
fn color_and_attachment_line_breaks_stay_in_one_property() {
    let body = "BEGIN:VEVENT\r\nUID:c\r\nSUMMARY:C\r\nDTSTART:20260302T090000\r\nEND:VEVENT\r\n";
    let mut events = parse_calendar(&calendar(body)).unwrap();
    events[0].color = Some("blue\nSTATUS:CANCELLED".to_string());
    events[0].attachments = vec!["https://example.com/a\nb".to_string()];

    let written = write_calendar(&events);
    assert!(!written.contains("\r\nSTATUS:"));

    let reread = parse_calendar(&written).unwrap();
    assert_eq!(reread[0].color, events[0].color);
    assert_eq!(reread[0].attachments, events[0].attachments);
    assert_eq!(reread[0].status, None);
}
