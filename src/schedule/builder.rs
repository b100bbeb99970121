// src/schedule/builder.rs

//! Programmatic schedule construction, for hosts that prefer typed fields
//! over cron strings.

use crate::errors::{CronError, Result};

use super::resolve::{value_range, Resolver};
use super::Schedule;

/// Shape of a single schedule field.
#[derive(Debug, Clone)]
pub enum Field {
    /// Fire on every value.
    Every,
    /// Fire on one value.
    At(i64),
    /// Fire on every value in the inclusive window.
    Window { from: i64, to: i64 },
    /// Fire on each listed value.
    Each(Vec<i64>),
    /// Fire on `from`, `from + every`, ... up to the field maximum.
    Step { from: i64, every: i64 },
}

/// Fluent builder for a [`Schedule`].
///
/// Every field defaults to [`Field::Every`]; values outside a field's range
/// are rejected with [`CronError::OutOfBoundsAlphanum`]. Weekday fields
/// accept the non-standard `7` alias for Sunday; list values
/// ([`Field::Each`] and [`Field::Step`]) fold it onto 0, exactly as the
/// expression compiler does, while [`Field::At`] and [`Field::Window`]
/// keep `7` as written.
///
/// ```
/// use cronloop::schedule::builder::{Builder, Field};
///
/// let schedule = Builder::new()
///     .seconds(Field::At(0))?
///     .minutes(Field::At(30))?
///     .hours(Field::Window { from: 9, to: 17 })?
///     .days_of_week(Field::Each(vec![1, 2, 3, 4, 5]))?
///     .build();
/// # Ok::<(), cronloop::CronError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    sec: Resolver,
    min: Resolver,
    hour: Resolver,
    day_of_month: Resolver,
    month: Resolver,
    day_of_week: Resolver,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            sec: Resolver::Everytime,
            min: Resolver::Everytime,
            hour: Resolver::Everytime,
            day_of_month: Resolver::Everytime,
            month: Resolver::Everytime,
            day_of_week: Resolver::Everytime,
        }
    }

    pub fn seconds(mut self, field: Field) -> Result<Self> {
        self.sec = compile(field, 0, 59)?;
        Ok(self)
    }

    pub fn minutes(mut self, field: Field) -> Result<Self> {
        self.min = compile(field, 0, 59)?;
        Ok(self)
    }

    pub fn hours(mut self, field: Field) -> Result<Self> {
        self.hour = compile(field, 0, 23)?;
        Ok(self)
    }

    pub fn days_of_month(mut self, field: Field) -> Result<Self> {
        self.day_of_month = compile(field, 1, 31)?;
        Ok(self)
    }

    pub fn months(mut self, field: Field) -> Result<Self> {
        self.month = compile(field, 1, 12)?;
        Ok(self)
    }

    pub fn days_of_week(mut self, field: Field) -> Result<Self> {
        self.day_of_week = normalize_weekdays(compile(field, 0, 7)?);
        Ok(self)
    }

    pub fn build(self) -> Schedule {
        Schedule {
            sec: self.sec,
            min: self.min,
            hour: self.hour,
            day_of_month: self.day_of_month,
            month: self.month,
            day_of_week: self.day_of_week,
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(field: Field, min: i64, max: i64) -> Result<Resolver> {
    match field {
        Field::Every => Ok(Resolver::Everytime),
        Field::At(at) => {
            bounds(at, min, max)?;
            Ok(Resolver::Fixed { max, at })
        }
        Field::Window { from, to } => {
            bounds(from, min, max)?;
            bounds(to, min, max)?;
            Ok(Resolver::Range { max, from, to })
        }
        Field::Each(mut values) => {
            if values.is_empty() {
                return Err(CronError::EmptyAlphanum);
            }

            for &value in &values {
                bounds(value, min, max)?;
            }

            values.sort_unstable();
            values.dedup();

            Ok(Resolver::Step { max, steps: values })
        }
        Field::Step { from, every } => {
            bounds(from, min, max)?;

            if every < 1 {
                return Err(CronError::OutOfBoundsAlphanum {
                    value: every,
                    min: 1,
                    max,
                });
            }

            Ok(Resolver::Step {
                max,
                steps: value_range(from, max, every),
            })
        }
    }
}

fn bounds(value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(CronError::OutOfBoundsAlphanum { value, min, max });
    }

    Ok(())
}

// Same normalization the expression compiler applies: only step lists fold
// 7 onto 0. Fixed values and windows keep 7, which the wrap arithmetic
// already resolves to Sundays.
fn normalize_weekdays(resolver: Resolver) -> Resolver {
    match resolver {
        Resolver::Step { max, mut steps } => {
            if steps.contains(&7) {
                for step in steps.iter_mut() {
                    if *step == 7 {
                        *step = 0;
                    }
                }

                steps.sort_unstable();
                steps.dedup();
            }

            Resolver::Step { max, steps }
        }
        other => other,
    }
}
