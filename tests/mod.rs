use chrono::{NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use opencal::{CalendarEvent, ParserOptions, parse, parse_with, types::Tz};

fn utc_options() -> ParserOptions {
    ParserOptions::default().with_timezone(Tz::UTC)
}

fn naive(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

fn utc(s: &str) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&naive(s))
}

/// Feed order is kept; only the generated uid may differ between parses.
fn without_uid(events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
    events
        .into_iter()
        .map(|event| CalendarEvent {
            uid: String::new(),
            ..event
        })
        .collect()
}

mod parser {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(include_str!("./resources/team.ics"))]
    #[case(include_str!("./resources/folded.ics"))]
    #[case(include_str!("./resources/malformed.ics"))]
    #[case(include_str!("./resources/holidays.ics"))]
    #[case("BEGIN:VEVENT\r\nDTSTART:20240115T140000\r\nEND:VEVENT\r\n")]
    fn idempotence(#[case] input: &str) {
        let first = parse_with(input, "cal", &utc_options());
        let second = parse_with(input, "cal", &utc_options());
        similar_asserts::assert_eq!(without_uid(first), without_uid(second));
    }

    #[test]
    fn supplied_uids_are_kept() {
        let input = include_str!("./resources/team.ics");
        assert_eq!(parse(input, "team"), parse(input, "team"));
    }

    #[test]
    fn team() {
        let events = parse_with(include_str!("./resources/team.ics"), "team", &utc_options());
        let uids: Vec<&str> = events.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(
            uids,
            vec![
                "standup-20240115@example.com",
                "offsite-20240118@example.com",
                "review-20240116@example.com",
                "lunch-20240117@example.com",
            ]
        );
        assert!(events.iter().all(|e| e.source_id == "team"));

        let standup = &events[0];
        assert_eq!(standup.summary, "Standup");
        assert_eq!(standup.location, "Room 4, 2nd floor");
        // The alarm's description stays in the alarm
        assert_eq!(standup.description, "");
        assert_eq!(standup.start, utc("2024-01-15 09:00"));
        assert_eq!(standup.end, utc("2024-01-15 09:15"));

        let offsite = &events[1];
        assert!(offsite.is_all_day);
        assert!(offsite.is_multi_day());
        assert_eq!(offsite.start, utc("2024-01-18 00:00"));
        assert_eq!(offsite.end, utc("2024-01-20 00:00"));
        assert_eq!(
            offsite.description,
            "Two days out of the office.\nBring a laptop."
        );

        let review = &events[2];
        assert!(!review.is_all_day);
        assert_eq!(review.start, utc("2024-01-16 13:00"));
        assert_eq!(review.end, utc("2024-01-16 14:30"));

        // Windows zone names are unknown and read as floating time
        let lunch = &events[3];
        assert_eq!(lunch.start, utc("2024-01-17 12:00"));
        assert_eq!(lunch.end - lunch.start, TimeDelta::hours(1));
    }

    #[test]
    fn tzid_resolution_can_be_disabled() {
        let options = ParserOptions {
            resolve_tzid: false,
            ..utc_options()
        };
        let events = parse_with(include_str!("./resources/team.ics"), "team", &options);
        assert_eq!(events[2].start, utc("2024-01-16 14:00"));
    }

    #[test]
    fn converted_to_requested_timezone() {
        let options = ParserOptions::default().with_timezone(Tz::Olson(chrono_tz::America::New_York));
        let events = parse_with(include_str!("./resources/team.ics"), "team", &options);

        assert_eq!(events[0].start.naive_local(), naive("2024-01-15 04:00"));
        // Dates stay on their calendar day
        assert_eq!(events[1].start.naive_local(), naive("2024-01-18 00:00"));
        assert_eq!(events[2].start.naive_local(), naive("2024-01-16 08:00"));
        assert_eq!(events[3].start.naive_local(), naive("2024-01-17 12:00"));
    }

    #[test]
    fn folded_and_escaped() {
        let events = parse_with(include_str!("./resources/folded.ics"), "cal", &utc_options());
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.summary, "Quarterly planning");
        assert_eq!(
            event.description,
            "Line1\nLine2, continued and a very long line that wraps across several physical \
             lines; with a semicolon and a backslash \\n kept"
        );
        assert_eq!(event.location, "MainHall");
    }

    #[rstest]
    #[case("SUMMARY:Long\r\n Title\r\n", "LongTitle")]
    #[case("SUMMARY:Long\r\n  Title\r\n", "Long Title")]
    #[case("SUMMARY:Long\n\tTitle\n", "LongTitle")]
    #[case("SUMMARY:Long Title\r\n", "Long Title")]
    fn folding(#[case] summary: &str, #[case] expected: &str) {
        let input = format!("BEGIN:VEVENT\r\nDTSTART:20240115\r\n{summary}END:VEVENT\r\n");
        let events = parse_with(&input, "cal", &utc_options());
        assert_eq!(events[0].summary, expected);
    }

    #[test]
    fn all_day_at_local_midnight() {
        let events = parse("BEGIN:VEVENT\r\nDTSTART:20240115\r\nEND:VEVENT\r\n", "cal");
        let event = &events[0];
        assert!(event.is_all_day);
        assert_eq!(event.start.naive_local(), naive("2024-01-15 00:00"));
        assert_eq!(event.end.naive_local(), naive("2024-01-16 00:00"));
    }

    #[test]
    fn utc_instant() {
        let events = parse("BEGIN:VEVENT\r\nDTSTART:20240115T140000Z\r\nEND:VEVENT\r\n", "cal");
        assert!(!events[0].is_all_day);
        assert_eq!(events[0].start.with_timezone(&Utc), utc("2024-01-15 14:00"));
    }

    #[test]
    fn default_duration() {
        let events = parse("BEGIN:VEVENT\r\nDTSTART:20240115T140000\r\nEND:VEVENT\r\n", "cal");
        assert_eq!(events[0].start.naive_local(), naive("2024-01-15 14:00"));
        assert_eq!(events[0].end - events[0].start, TimeDelta::hours(1));
    }

    #[test]
    fn escaping() {
        let input = "BEGIN:VEVENT\r\n\
            DTSTART:20240115\r\n\
            DESCRIPTION:Line1\\nLine2\\, continued\r\n\
            END:VEVENT\r\n";
        let events = parse(input, "cal");
        let lines: Vec<&str> = events[0].description.lines().collect();
        assert_eq!(lines, vec!["Line1", "Line2, continued"]);
    }

    #[test]
    fn malformed() {
        let events = parse_with(include_str!("./resources/malformed.ics"), "cal", &utc_options());
        let uids: Vec<&str> = events.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["ok@example.com", "badend@example.com"]);

        let bad_end = &events[1];
        assert_eq!(bad_end.start, utc("2024-01-12 10:00"));
        assert_eq!(bad_end.end, utc("2024-01-12 11:00"));
    }

    #[test]
    fn unterminated_block_next_to_well_formed_one() {
        let input = "BEGIN:VCALENDAR\r\n\
            BEGIN:VEVENT\r\n\
            UID:good\r\n\
            DTSTART:20240115T090000Z\r\n\
            END:VEVENT\r\n\
            BEGIN:VEVENT\r\n\
            UID:bad\r\n\
            DTSTART:20240116T090000Z\r\n";
        let events = parse(input, "cal");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "good");
    }

    #[test]
    fn recurrence_override_gets_its_own_uid() {
        let input = "BEGIN:VCALENDAR\r\n\
            BEGIN:VEVENT\r\n\
            UID:weekly@example.com\r\n\
            SUMMARY:Weekly sync\r\n\
            DTSTART:20240115T090000Z\r\n\
            RRULE:FREQ=WEEKLY\r\n\
            END:VEVENT\r\n\
            BEGIN:VEVENT\r\n\
            UID:weekly@example.com\r\n\
            RECURRENCE-ID:20240122T090000Z\r\n\
            SUMMARY:Weekly sync (moved)\r\n\
            DTSTART:20240122T100000Z\r\n\
            END:VEVENT\r\n\
            END:VCALENDAR\r\n";
        let events = parse_with(input, "cal", &utc_options());
        let uids: Vec<&str> = events.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(
            uids,
            vec!["weekly@example.com", "weekly@example.com#20240122T090000Z"]
        );
        assert_eq!(events[1].start, utc("2024-01-22 10:00"));
        // Uniqueness holds per parse, so a second parse yields the same uids
        assert_eq!(parse_with(input, "cal", &utc_options()), events);
    }

    #[test]
    fn unbalanced_quote_in_parameter() {
        let input = "BEGIN:VEVENT\r\n\
            UID:q\r\n\
            DTSTART;X-NOTE=\"oops:20240115T090000Z\r\n\
            END:VEVENT\r\n";
        let events = parse_with(input, "cal", &utc_options());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, utc("2024-01-15 09:00"));
    }

    #[test]
    fn unknown_properties() {
        let plain = "BEGIN:VEVENT\r\nUID:1\r\nSUMMARY:Title\r\nDTSTART:20240115T140000Z\r\nEND:VEVENT\r\n";
        let custom = "BEGIN:VEVENT\r\nUID:1\r\nSUMMARY:Title\r\nX-CUSTOM:foo\r\n\
            RRULE:FREQ=WEEKLY\r\nDTSTART:20240115T140000Z\r\nEND:VEVENT\r\n";
        assert_eq!(parse(plain, "cal"), parse(custom, "cal"));
    }

    #[rstest]
    #[case("")]
    #[case("\r\n\r\n")]
    #[case("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n")]
    #[case("not an ics file at all")]
    #[case("END:VEVENT\r\nEND:VEVENT\r\n")]
    #[case("\u{feff}\u{0}:::;;;\r\n \r\n\t")]
    fn no_events(#[case] input: &str) {
        assert!(parse(input, "cal").is_empty());
    }

    #[test]
    fn serializes() {
        let events = parse_with(include_str!("./resources/holidays.ics"), "holidays", &utc_options());
        let json = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json["uid"], "newyear-2024@holidays");
        assert_eq!(json["summary"], "New Year's Day");
        assert_eq!(json["is_all_day"], true);
        assert_eq!(json["source_id"], "holidays");
    }
}

mod line_reader {
    use opencal::{LineReader, parser::unfold};
    use rstest::rstest;

    #[test]
    fn multibyte_fold() {
        // A fold may split a multi-byte character's line, not the character itself
        let input = "SUMMARY:Caf\r\n é au lait\r\n";
        let lines: Vec<String> = LineReader::from_text(input)
            .map(|line| line.as_str().to_owned())
            .collect();
        assert_eq!(lines, vec!["SUMMARY:Café au lait"]);
    }

    #[rstest]
    #[case(include_str!("./resources/team.ics"))]
    #[case(include_str!("./resources/folded.ics"))]
    fn matches_unfold(#[case] input: &str) {
        let from_reader: Vec<String> = LineReader::from_text(input)
            .map(|line| line.as_str().to_owned())
            .collect();
        let from_unfold: Vec<String> = unfold(input)
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        similar_asserts::assert_eq!(from_reader, from_unfold);
    }
}

mod views {
    use super::*;
    use chrono::Weekday;
    use opencal::view::{MonthGrid, ViewMode, filter_events, group_by_day};

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn month_grid_from_feed() {
        let events = parse_with(include_str!("./resources/team.ics"), "team", &utc_options());
        let grid = MonthGrid::new(jan(1), Weekday::Mon, &events, jan(16));

        let summaries = |day: u32| -> Vec<&str> {
            grid.day(jan(day))
                .unwrap()
                .events
                .iter()
                .map(|e| e.summary.as_str())
                .collect()
        };
        assert_eq!(summaries(15), vec!["Standup"]);
        assert_eq!(summaries(16), vec!["Design review"]);
        assert_eq!(summaries(18), vec!["Offsite"]);
        assert_eq!(summaries(19), vec!["Offsite"]);
        assert!(summaries(20).is_empty());
        assert!(grid.day(jan(16)).unwrap().is_today);
    }

    #[test]
    fn list_and_upcoming() {
        let events = parse_with(
            include_str!("./resources/holidays.ics"),
            "holidays",
            &utc_options(),
        );
        let now = Tz::UTC.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let listed = filter_events(&events, ViewMode::List, jan(20), now);
        assert_eq!(listed.len(), 2);
        let groups = group_by_day(listed);
        assert_eq!(groups.iter().map(|g| g.date).collect::<Vec<_>>(), vec![jan(1), jan(6)]);

        let upcoming = filter_events(&events, ViewMode::Upcoming, jan(20), now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].summary, "Epiphany");
    }
}

mod aggregate {
    use opencal::{
        CalendarSource, ParserOptions,
        aggregate::{Aggregator, CalendarState},
        fetch::HttpFetcher,
        types::Tz,
    };
    use std::time::Duration;

    fn source(id: &str, url: String) -> CalendarSource {
        let mut source = CalendarSource::new(id).with_url(&url);
        source.id = id.to_owned();
        source
    }

    #[tokio::test]
    async fn refresh_over_http() {
        let mut server = mockito::Server::new_async().await;
        let team = server
            .mock("GET", "/team.ics")
            .with_body(include_str!("./resources/team.ics"))
            .create_async()
            .await;
        let holidays = server
            .mock("GET", "/holidays.ics")
            .with_body(include_str!("./resources/holidays.ics"))
            .create_async()
            .await;
        let broken = server
            .mock("GET", "/broken.ics")
            .with_status(500)
            .create_async()
            .await;

        let sources = vec![
            source("team", format!("{}/team.ics", server.url())),
            source("holidays", format!("{}/holidays.ics", server.url())),
            source("broken", format!("{}/broken.ics", server.url())),
        ];
        let aggregator = Aggregator::new(
            HttpFetcher::new(Duration::from_secs(5)).unwrap(),
            ParserOptions::default().with_timezone(Tz::UTC),
        );
        let mut state = CalendarState::new();
        assert!(state.refresh_if_changed(&sources, &aggregator).await);

        team.assert_async().await;
        holidays.assert_async().await;
        broken.assert_async().await;

        assert_eq!(state.events.len(), 7);
        assert!(state.events.is_sorted_by_key(|e| e.start));
        assert_eq!(state.failures.len(), 1);
        assert_eq!(state.failures[0].source_id, "broken");
        assert_eq!(state.events[0].summary, "New Year's Day");
        assert_eq!(state.events.last().unwrap().source_id, "holidays");
    }
}
