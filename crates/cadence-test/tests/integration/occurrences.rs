use cadence_test::component::range::overlaps;
use cadence_test::component::{
    Occurrence, QueryOptions, RecurrenceError, Schedule, TimeSpan, TimeWindow,
};
use chrono::{TimeDelta, Utc};

use super::helpers::{ExampleEvent, date, example_event, rfc3339};

/// ## Summary
/// A range query returns values exposing start and end times.
#[test_log::test]
fn occurrence_has_start_and_end() {
    let schedule = Schedule::new(example_event(ExampleEvent::Daily)).expect("schedule");

    let occurrences = schedule
        .occurrences_between(date("2014-02-01"), date("2014-03-01"), QueryOptions::default())
        .expect("valid range");
    let first = occurrences.first().expect("february has occurrences");

    assert_eq!(occurrences.len(), 28);
    assert_eq!(first.start_time(), rfc3339("2014-02-01T09:00:00-08:00"));
    assert_eq!(first.end_time(), rfc3339("2014-02-01T10:00:00-08:00"));
}

/// ## Summary
/// Spanning queries include the occurrence already running when the window
/// opens, and the schedule start is the first occurrence, not the window.
#[test_log::test]
fn week_long_spanning_query() {
    let schedule = Schedule::new(example_event(ExampleEvent::WeekLong)).expect("schedule");
    let window_start = rfc3339("2014-01-13T09:00:00-08:00");

    let spanning = schedule
        .occurrences_between(window_start, date("2014-01-20"), QueryOptions::spanning())
        .expect("valid range");
    let strict = schedule
        .occurrences_between(window_start, date("2014-01-20"), QueryOptions::default())
        .expect("valid range");

    assert_eq!(schedule.start_time(), rfc3339("2014-01-13T08:00:00-08:00"));
    assert_eq!(spanning.len(), 7);
    assert_eq!(strict.len(), 6);
    assert_eq!(spanning[0].start_time(), schedule.start_time());
}

/// ## Summary
/// A week-long weekly event is returned by a window opening mid-week only
/// when spanning is requested.
#[test_log::test]
fn multi_day_occurrence_spans_window() {
    let event = example_event(ExampleEvent::WeeklyWithCount).with_duration(TimeDelta::days(7));
    let schedule = Schedule::new(event).expect("schedule");
    let window_start = rfc3339("2014-01-08T00:00:00-08:00");
    let window_end = rfc3339("2014-01-10T00:00:00-08:00");

    let spanning = schedule
        .occurrences_between(window_start, window_end, QueryOptions::spanning())
        .expect("valid range");
    let strict = schedule
        .occurrences_between(window_start, window_end, QueryOptions::default())
        .expect("valid range");

    assert_eq!(spanning.len(), 1);
    assert_eq!(spanning[0].start_time(), rfc3339("2014-01-06T18:00:00-08:00"));
    assert!(strict.is_empty());
}

#[test_log::test]
fn first_saturday_of_month_timezoned() {
    let schedule =
        Schedule::new(example_event(ExampleEvent::FirstSaturdayOfMonth)).expect("schedule");

    let occurrences = schedule
        .occurrences_between(date("2014-02-01"), date("2014-03-01"), QueryOptions::default())
        .expect("valid range");

    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].start_time(), rfc3339("2014-02-01T10:00:00-05:00"));
    assert_eq!(occurrences[0].end_time(), rfc3339("2014-02-01T12:00:00-05:00"));
    assert_eq!(occurrences[0].start_time().timezone(), chrono_tz::Tz::America__New_York);
}

#[test_log::test]
fn weekly_with_count_materializes_every_occurrence() {
    let schedule = Schedule::new(example_event(ExampleEvent::WeeklyWithCount)).expect("schedule");

    let all = schedule.all_occurrences().expect("bounded rule");

    assert_eq!(all.len(), 151);
    assert!(all.iter().all(|o| o.duration() == TimeDelta::hours(1)));
    assert!(all.windows(2).all(|pair| pair[0].start_time() < pair[1].start_time()));
    assert_eq!(schedule.all_occurrences().expect("bounded rule"), all);
}

/// ## Summary
/// Without an end the event lasts the default hour.
#[test_log::test]
fn end_time_defaults_to_one_hour() {
    let event = example_event(ExampleEvent::WeeklyWithCount).without_end();
    let schedule = Schedule::new(event).expect("schedule");

    assert_eq!(schedule.end_time(), schedule.start_time() + TimeDelta::hours(1));
}

#[test_log::test]
fn unbounded_rule_fails_fast() {
    let schedule = Schedule::new(example_event(ExampleEvent::Daily)).expect("schedule");

    assert!(matches!(
        schedule.all_occurrences(),
        Err(RecurrenceError::UnboundedExpansion)
    ));
}

#[test_log::test]
fn reversed_range_is_rejected() {
    let schedule = Schedule::new(example_event(ExampleEvent::Daily)).expect("schedule");

    let result = schedule.occurrences_between(
        date("2014-03-01"),
        date("2014-02-01"),
        QueryOptions::spanning(),
    );

    assert!(matches!(result, Err(RecurrenceError::InvalidRange { .. })));
}

/// ## Summary
/// Range results are exactly the occurrences accepted by the overlap
/// predicate, for both spanning modes.
#[test_log::test]
fn range_results_match_overlap_predicate() {
    let event = example_event(ExampleEvent::Daily).with_duration(TimeDelta::hours(30));
    let schedule = Schedule::new(event).expect("schedule");
    let windows = [
        ("2014-01-05T00:00:00-08:00", "2014-01-05T00:00:00-08:00"),
        ("2014-01-05T09:00:00-08:00", "2014-01-06T09:00:00-08:00"),
        ("2014-01-05T10:30:00-08:00", "2014-01-09T08:59:59-08:00"),
        ("2014-01-20T15:00:00-08:00", "2014-02-02T00:00:00-08:00"),
    ];

    for (start, end) in windows {
        let window =
            TimeWindow::new(rfc3339(start).with_timezone(&Utc), rfc3339(end).with_timezone(&Utc))
                .expect("valid window");
        for spans in [false, true] {
            let expected: Vec<Occurrence> = schedule
                .occurrences()
                .take_while(|o| o.start_time().with_timezone(&Utc) < window.end())
                .filter(|o| overlaps(o, &window, spans))
                .collect();
            let actual = schedule
                .occurrences_between(rfc3339(start), rfc3339(end), QueryOptions { spans })
                .expect("valid range");

            assert_eq!(actual, expected, "window {start}..{end} spans={spans}");
            assert!(actual.iter().all(|o| overlaps(o, &window, spans)));
        }
    }
}

#[test_log::test]
fn occurrences_serialize_with_zone_offsets() {
    let schedule = Schedule::new(example_event(ExampleEvent::WeeklyWithCount)).expect("schedule");
    let first = schedule.occurrences().next().expect("first occurrence");

    let json = serde_json::to_value(first).expect("serializable");

    assert_eq!(json["kind"], "timed");
    assert_eq!(json["start"], "2014-01-06T18:00:00-08:00");
    assert_eq!(json["end"], "2014-01-06T19:00:00-08:00");
}
