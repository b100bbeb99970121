// src/schedule/mod.rs

//! Cron expression compiler and next-fire scheduler.
//!
//! The compiler is a pipeline: character pre-check → [`lexer`] → [`parser`]
//! → [`validate`] → [`process`], producing a [`Schedule`] of six per-field
//! [`Resolver`]s. A [`CronScheduler`] pairs a schedule with a time zone and
//! turns "distance to next occurrence" answers into absolute wall-clock
//! instants, leaning on calendar normalization for all field overflow.

pub mod builder;
pub mod lexer;
pub mod parser;
pub mod process;
pub mod resolve;
pub mod validate;

use std::fmt;
use std::sync::Arc;

use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use tracing::{debug, info_span};

use crate::errors::Result;
use crate::metrics::{Metrics, NoOpMetrics};

pub use resolve::Resolver;

/// The implicit seconds resolver of five-field expressions (top of the
/// minute). The scheduler special-cases exactly this value; see
/// [`CronScheduler::next`].
pub(crate) const IMPLICIT_SECONDS: Resolver = Resolver::Fixed { max: 59, at: 0 };

/// A compiled cron expression: one resolver per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub sec: Resolver,
    pub min: Resolver,
    pub hour: Resolver,
    pub day_of_month: Resolver,
    pub month: Resolver,
    pub day_of_week: Resolver,
}

/// Compile a cron expression into a [`Schedule`].
///
/// Accepts five-field (`min hour dom month dow`) and six-field (leading
/// seconds) expressions, plus the `@hourly`-style overrides. All errors a
/// bad expression triggers are reported together.
pub fn parse(input: &str) -> Result<Schedule> {
    validate::validate_characters(input)?;

    let ast = parser::parse(input);
    validate::validate(&ast)?;

    Ok(process::process(&ast))
}

/// Computes absolute next-fire instants for a [`Schedule`] within a time
/// zone.
#[derive(Clone)]
pub struct CronScheduler {
    schedule: Schedule,
    tz: Tz,
    metrics: Arc<dyn Metrics>,
}

impl fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronScheduler")
            .field("schedule", &self.schedule)
            .field("tz", &self.tz)
            .finish_non_exhaustive()
    }
}

impl CronScheduler {
    /// Scheduler for `schedule`, localized to UTC.
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            tz: chrono_tz::UTC,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Compile `input` and wrap it into a UTC scheduler.
    pub fn parse(input: &str) -> Result<Self> {
        Ok(Self::new(parse(input)?))
    }

    /// Localize the schedule to `tz`.
    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// The next scheduled instant strictly derived from `now`.
    ///
    /// Each field resolves its distance independently against `now`
    /// localized to the schedule's zone, probing the seconds with
    /// `second + 1`; the deltas are added to the broken-down components and
    /// the calendar reassembly normalizes any overflow (27 hours becomes
    /// one day and three hours). Five-field schedules carry the implicit
    /// `Fixed{59, 0}` seconds and get one extra second, which collapses the
    /// probe back onto a clean minute boundary. When a day-of-week
    /// constraint is present, the weekday of the candidate date is resolved
    /// in a second pass that advances whole days.
    pub fn next(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let _span = info_span!("scheduler.next").entered();
        self.metrics.inc_scheduler_next_calls();

        let local = now.with_timezone(&self.tz);
        let year = i64::from(local.year());
        let month = i64::from(local.month());
        let day = i64::from(local.day());
        let hour = i64::from(local.hour());
        let minute = i64::from(local.minute());
        let second = i64::from(local.second()) + 1;

        let mut next_second = self.schedule.sec.resolve(second);
        if self.schedule.sec == IMPLICIT_SECONDS {
            next_second += 1;
        }

        let next_minute = self.schedule.min.resolve(minute);
        let next_hour = self.schedule.hour.resolve(hour);
        let next_day = self.schedule.day_of_month.resolve(day);
        let next_month = self.schedule.month.resolve(month);

        let Some(day_time) = assemble(
            self.tz,
            year,
            month + next_month,
            day + next_day,
            hour + next_hour,
            minute + next_minute,
            second + next_second,
        ) else {
            // unrepresentable date (absurd year overflow); retry shortly
            return now + TimeDelta::seconds(1);
        };

        // short-circuit when the weekday is unconstrained
        if matches!(self.schedule.day_of_week, Resolver::Everytime) {
            debug!(at = %day_time, "next job");
            return day_time;
        }

        let local_day = day_time.with_timezone(&self.tz);
        let weekday = i64::from(local_day.weekday().num_days_from_sunday());
        let next_weekday = self.schedule.day_of_week.resolve(weekday);

        let Some(weekday_time) = assemble(
            self.tz,
            i64::from(local_day.year()),
            i64::from(local_day.month()),
            i64::from(local_day.day()) + next_weekday,
            i64::from(local_day.hour()),
            i64::from(local_day.minute()),
            i64::from(local_day.second()),
        ) else {
            return day_time;
        };

        debug!(at = %weekday_time, "next job");
        weekday_time
    }
}

/// Reassemble possibly-overflowing date components into an instant.
///
/// Months carry into years, then days/hours/minutes/seconds are applied as
/// plain offsets from the first of the month, so any overflow normalizes
/// naturally (Feb 30 becomes Mar 1 or 2, minute 60 becomes the next hour).
/// Ambiguous local times take the earliest mapping; times inside a DST gap
/// land one hour later.
fn assemble(
    tz: Tz,
    year: i64,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
) -> Option<DateTime<Utc>> {
    let months = year * 12 + (month - 1);
    let year = i32::try_from(months.div_euclid(12)).ok()?;
    let month = (months.rem_euclid(12) + 1) as u32;

    let naive = NaiveDate::from_ymd_opt(year, month, 1)?
        .and_time(NaiveTime::MIN)
        .checked_add_signed(TimeDelta::days(day - 1))?
        .checked_add_signed(TimeDelta::seconds(hour * 3600 + minute * 60 + second))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&naive.checked_add_signed(TimeDelta::hours(1))?)
            .earliest()
            .map(|at| at.with_timezone(&Utc)),
    }
}
