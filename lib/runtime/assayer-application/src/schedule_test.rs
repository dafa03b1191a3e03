use chrono::{Datelike, Timelike, Weekday};

use crate::schedule::Schedule;
use crate::test_support::utc;

#[test]
fn weekly_schedule_fires_on_sunday_at_two() {
    let schedule = Schedule::parse("0 2 * * 0").unwrap();
    // 2024-01-03 is a Wednesday.
    let next = schedule.next_after(utc(2024, 1, 3, 12, 0)).unwrap();
    assert_eq!(next, utc(2024, 1, 7, 2, 0));
    assert_eq!(next.weekday(), Weekday::Sun);
    assert_eq!(next.hour(), 2);
}

#[test]
fn next_occurrence_is_strictly_after() {
    let schedule = Schedule::parse("0 2 * * 0").unwrap();
    let next = schedule.next_after(utc(2024, 1, 7, 2, 0)).unwrap();
    assert_eq!(next, utc(2024, 1, 14, 2, 0));
}

#[test]
fn every_fifteen_minutes() {
    let schedule = Schedule::parse("*/15 * * * *").unwrap();
    let next = schedule.next_after(utc(2024, 5, 1, 10, 7)).unwrap();
    assert_eq!(next, utc(2024, 5, 1, 10, 15));
}

#[test]
fn invalid_expressions_are_rejected() {
    let err = Schedule::parse("not a cron").unwrap_err();
    assert_eq!(err.expression, "not a cron");
    assert!(err.to_string().contains("invalid cron schedule"));

    assert!(Schedule::parse("61 * * * *").is_err());
}
