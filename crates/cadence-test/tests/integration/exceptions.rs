use cadence_test::component::{
    Event, Frequency, Occurrence, QueryOptions, RecurrenceRule, Schedule, TimeSpan, WeekdayNum,
};
use chrono::{DateTime, Utc, Weekday};

use super::helpers::{ExampleEvent, date, example_event, rfc3339, zoned};

fn start_instants(schedule: &Schedule, n: usize, after: &str) -> Vec<DateTime<Utc>> {
    schedule
        .next_occurrences(n, &rfc3339(after))
        .iter()
        .map(|o| o.start_time().with_timezone(&Utc))
        .collect()
}

/// ## Summary
/// Excluded dates are skipped even when written in another offset.
#[test_log::test]
fn multiple_exdates_are_skipped() {
    let schedule = Schedule::new(example_event(ExampleEvent::MultipleExdate)).expect("schedule");

    assert!(schedule.occurring_at(&rfc3339("2014-02-03T16:00:00-08:00")));
    assert!(!schedule.occurring_at(&rfc3339("2014-02-10T16:00:00-08:00")));
    assert!(!schedule.occurring_at(&rfc3339("2014-02-17T16:00:00-08:00")));
    assert!(schedule.occurring_at(&rfc3339("2014-02-24T16:00:00-08:00")));

    let february = schedule
        .occurrences_between(date("2014-02-01"), date("2014-03-01"), QueryOptions::default())
        .expect("valid range");
    let days: Vec<_> = february.iter().map(Occurrence::date).collect();
    assert_eq!(days, vec![date("2014-02-03"), date("2014-02-24")]);
}

/// ## Summary
/// Occurrences keep their wall-clock time on both sides of the DST change,
/// and exclusions apply by instant in either period.
#[test_log::test]
fn exdate_in_different_dst_period() {
    let schedule =
        Schedule::new(example_event(ExampleEvent::ExdateInDifferentDst)).expect("schedule");

    let starts = start_instants(&schedule, 20, "2018-09-01T00:00:00-07:00");
    let has = |value: &str| starts.contains(&rfc3339(value).with_timezone(&Utc));

    assert_eq!(starts.len(), 20);
    // Before the time change
    assert!(has("2018-09-04T10:00:00-07:00"));
    assert!(!has("2018-09-04T10:00:00-08:00"));
    // After the time change
    assert!(!has("2018-11-06T10:00:00-07:00"));
    assert!(has("2018-11-06T10:00:00-08:00"));
    // Excluded, written in UTC
    assert!(!has("2018-11-13T10:00:00-08:00"));
    assert!(has("2018-11-20T10:00:00-08:00"));

    assert!(!schedule.occurs_at(&rfc3339("2018-07-10T10:00:00-07:00")));
    assert!(schedule.occurs_at(&rfc3339("2018-07-17T10:00:00-07:00")));
}

/// ## Summary
/// COUNT is spent on raw candidates; excluded ones are not backfilled.
#[test_log::test]
fn count_is_consumed_before_exclusion() {
    let rule = RecurrenceRule::builder(Frequency::Weekly)
        .count(4)
        .exclude_date(&rfc3339("2014-02-10T16:00:00-08:00"))
        .exclude_date(&rfc3339("2014-02-17T16:00:00-08:00"))
        .build()
        .expect("valid rule");
    let event = Event::new(zoned("America/Los_Angeles", "2014-02-03T16:00:00")).with_rule(rule);
    let schedule = Schedule::new(event).expect("schedule");

    let all = schedule.all_occurrences().expect("bounded rule");

    assert_eq!(all.len(), 2);
    assert_eq!(all[0].start_time(), rfc3339("2014-02-03T16:00:00-08:00"));
    assert_eq!(all[1].start_time(), rfc3339("2014-02-24T16:00:00-08:00"));
}

#[test_log::test]
fn exclusion_rule_removes_weekends() {
    let weekends = RecurrenceRule::builder(Frequency::Weekly)
        .by_weekday([
            WeekdayNum::every(Weekday::Sat),
            WeekdayNum::every(Weekday::Sun),
        ])
        .build()
        .expect("valid exclusion rule");
    let rule = RecurrenceRule::builder(Frequency::Daily)
        .count(14)
        .exclusion_rule(weekends)
        .build()
        .expect("valid rule");
    let event = Event::new(zoned("Europe/Berlin", "2026-01-05T09:00:00")).with_rule(rule);
    let schedule = Schedule::new(event).expect("schedule");

    let all = schedule.all_occurrences().expect("bounded rule");

    assert_eq!(all.len(), 10);
    assert!(all.iter().all(|o| {
        let weekday = chrono::Datelike::weekday(&o.date());
        weekday != Weekday::Sat && weekday != Weekday::Sun
    }));
}

/// ## Summary
/// Added dates join the sequence in order, outside COUNT, and can
/// themselves be excluded.
#[test_log::test]
fn added_dates_merge_in_order() {
    let rule = RecurrenceRule::builder(Frequency::Weekly)
        .count(3)
        .add_date(&rfc3339("2026-01-07T09:00:00+01:00"))
        .add_date(&rfc3339("2026-03-01T09:00:00+01:00"))
        // Duplicate of a rule occurrence
        .add_date(&rfc3339("2026-01-12T08:00:00Z"))
        .exclude_date(&rfc3339("2026-03-01T08:00:00Z"))
        .build()
        .expect("valid rule");
    let event = Event::new(zoned("Europe/Berlin", "2026-01-05T09:00:00")).with_rule(rule);
    let schedule = Schedule::new(event).expect("schedule");

    let days: Vec<_> = schedule
        .all_occurrences()
        .expect("bounded rule")
        .iter()
        .map(Occurrence::date)
        .collect();

    assert_eq!(
        days,
        vec![
            date("2026-01-05"),
            date("2026-01-07"),
            date("2026-01-12"),
            date("2026-01-19"),
        ]
    );
}
