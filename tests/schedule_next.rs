// tests/schedule_next.rs

//! Next-fire computation scenarios for compiled schedules.

use chrono::{DateTime, TimeZone, Utc};
use cronloop::schedule::CronScheduler;

fn utc(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .unwrap()
}

struct Case {
    name: &'static str,
    cron: &'static str,
    input: DateTime<Utc>,
    wants: DateTime<Utc>,
}

#[test]
fn next_fire_scenarios() {
    let cases = [
        Case {
            name: "every second",
            cron: "* * * * * *",
            input: utc(2023, 10, 30, 10, 12, 43),
            wants: utc(2023, 10, 30, 10, 12, 44),
        },
        Case {
            name: "every fifth second",
            cron: "*/5 * * * * *",
            input: utc(2023, 10, 30, 10, 12, 43),
            wants: utc(2023, 10, 30, 10, 12, 45),
        },
        Case {
            name: "every fifth second, from a match",
            cron: "*/5 * * * * *",
            input: utc(2023, 10, 30, 10, 12, 45),
            wants: utc(2023, 10, 30, 10, 12, 50),
        },
        Case {
            name: "seconds with mixed step and set",
            cron: "0/3,2 * * * * *",
            input: utc(2023, 10, 30, 10, 12, 45),
            wants: utc(2023, 10, 30, 10, 12, 48),
        },
        Case {
            name: "every minute",
            cron: "* * * * *",
            input: utc(2023, 10, 30, 10, 12, 43),
            wants: utc(2023, 10, 30, 10, 13, 0),
        },
        Case {
            name: "top of every hour",
            cron: "0 * * * *",
            input: utc(2023, 10, 30, 10, 12, 43),
            wants: utc(2023, 10, 30, 11, 0, 0),
        },
        Case {
            name: "daily with day change",
            cron: "0 0 * * *",
            input: utc(2023, 10, 30, 22, 12, 43),
            wants: utc(2023, 10, 31, 0, 0, 0),
        },
        Case {
            name: "weekdays only, next day allowed",
            cron: "0 0 * * 1-5",
            input: utc(2023, 10, 30, 22, 12, 43),
            wants: utc(2023, 10, 31, 0, 0, 0),
        },
        Case {
            name: "no weekends nor wednesdays",
            cron: "0 0 * * 1,2,4,5",
            input: utc(2023, 10, 31, 22, 12, 43),
            wants: utc(2023, 11, 2, 0, 0, 0),
        },
        Case {
            name: "no weekends nor wednesdays, as ranges",
            cron: "0 0 * * 1-2,4-5",
            input: utc(2023, 10, 31, 22, 12, 43),
            wants: utc(2023, 11, 2, 0, 0, 0),
        },
        Case {
            name: "stepped hours with weekday ranges",
            cron: "0 0/3,2 * * 1-2,4-5",
            input: utc(2023, 10, 31, 22, 12, 43),
            wants: utc(2023, 11, 2, 0, 0, 0),
        },
        Case {
            name: "weekday step list covering the work week",
            cron: "0 0 * * 1,2,3,4,5",
            input: utc(2023, 10, 30, 22, 12, 43),
            wants: utc(2023, 10, 31, 0, 0, 0),
        },
        Case {
            name: "every third hour",
            cron: "0 */3 * * *",
            input: utc(2023, 10, 30, 22, 12, 43),
            wants: utc(2023, 10, 31, 0, 0, 0),
        },
        Case {
            name: "minute window",
            cron: "0-5 * * * *",
            input: utc(2023, 10, 30, 10, 12, 43),
            wants: utc(2023, 10, 30, 11, 0, 0),
        },
        Case {
            name: "hourly override",
            cron: "@hourly",
            input: utc(2023, 10, 30, 10, 12, 43),
            wants: utc(2023, 10, 30, 11, 0, 0),
        },
        Case {
            name: "reboot behaves as hourly",
            cron: "@reboot",
            input: utc(2023, 10, 30, 10, 12, 43),
            wants: utc(2023, 10, 30, 11, 0, 0),
        },
        Case {
            name: "daily override",
            cron: "@daily",
            input: utc(2023, 10, 30, 22, 12, 43),
            wants: utc(2023, 10, 31, 0, 0, 0),
        },
        Case {
            name: "sunday alias seven",
            cron: "0 0 * * 7",
            input: utc(2023, 11, 2, 22, 12, 43),
            wants: utc(2023, 11, 5, 0, 0, 0),
        },
        Case {
            name: "day thirty in february normalizes into march",
            cron: "0 12 30 * *",
            input: utc(2024, 2, 10, 10, 12, 43),
            wants: utc(2024, 3, 1, 13, 0, 0),
        },
    ];

    for case in cases {
        let scheduler = CronScheduler::parse(case.cron)
            .unwrap_or_else(|err| panic!("{}: parse {:?}: {err}", case.name, case.cron));

        assert_eq!(
            scheduler.next(case.input),
            case.wants,
            "{}: {:?} from {}",
            case.name,
            case.cron,
            case.input,
        );
    }
}

#[test]
fn full_seconds_window_matches_star() {
    let star = CronScheduler::parse("* * * * * *").unwrap();
    let window = CronScheduler::parse("0-59 * * * * *").unwrap();

    for input in [
        utc(2023, 10, 30, 10, 12, 43),
        utc(2023, 10, 30, 10, 12, 0),
        utc(2023, 12, 31, 23, 59, 30),
    ] {
        assert_eq!(star.next(input), window.next(input), "from {input}");
    }
}

#[test]
fn next_is_stable_until_the_fire_instant() {
    // probing times strictly between `now` and the computed instant must
    // not move the instant
    let scheduler = CronScheduler::parse("0 0 * * *").unwrap();

    let fire = scheduler.next(utc(2023, 10, 30, 22, 12, 43));
    assert_eq!(fire, utc(2023, 10, 31, 0, 0, 0));

    for probe in [
        utc(2023, 10, 30, 22, 50, 0),
        utc(2023, 10, 30, 23, 30, 30),
        utc(2023, 10, 30, 23, 59, 59),
    ] {
        assert_eq!(scheduler.next(probe), fire, "probe {probe}");
    }

    let scheduler = CronScheduler::parse("*/5 * * * * *").unwrap();
    let fire = scheduler.next(utc(2023, 10, 30, 10, 12, 41));
    assert_eq!(fire, utc(2023, 10, 30, 10, 12, 45));
    assert_eq!(scheduler.next(utc(2023, 10, 30, 10, 12, 43)), fire);
}

#[test]
fn schedules_evaluate_in_their_time_zone() {
    // daily at local midnight in New York: driven from a June UTC instant,
    // the fire lands at 04:00 UTC (EDT is UTC-4)
    let scheduler = CronScheduler::parse("0 0 * * *")
        .unwrap()
        .with_timezone(chrono_tz::America::New_York);

    assert_eq!(
        scheduler.next(utc(2023, 6, 15, 2, 12, 43)),
        utc(2023, 6, 15, 4, 0, 0),
    );
}
