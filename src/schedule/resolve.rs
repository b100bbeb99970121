// src/schedule/resolve.rs

//! Per-field "distance to next occurrence" algebra.
//!
//! Each schedule field (seconds, minutes, hours, ...) is compiled into one
//! [`Resolver`]. A resolver answers a single question: given the current
//! value of its field, how many units ahead is the next matching value,
//! wrapping through the field maximum?
//!
//! Resolvers are pure values with no interior state; they can be shared
//! freely across tasks.

/// Distance-to-next-occurrence resolver for one schedule field.
///
/// The set of shapes is closed; the processor in
/// [`process`](super::process) is exhaustive over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolver {
    /// Matches every value; the distance is always zero.
    Everytime,
    /// Matches a single value `at` within `0..=max`.
    Fixed { max: i64, at: i64 },
    /// Matches every value in the inclusive window `from..=to`.
    Range { max: i64, from: i64, to: i64 },
    /// Matches exactly the values listed in `steps`.
    ///
    /// Invariant: `steps` is non-empty, sorted ascending and deduplicated,
    /// with every element in `0..=max`. Weekday lists carry 0 for Sunday,
    /// never 7.
    Step { max: i64, steps: Vec<i64> },
}

impl Resolver {
    /// Distance to the next matching value.
    ///
    /// The scheduler feeds a candidate that may sit one past `max` (the
    /// seconds field is probed with `second + 1`, so 60 is a legal input);
    /// the wrap arithmetic then goes negative by one unit, which the
    /// calendar reassembly in [`CronScheduler`](super::CronScheduler)
    /// absorbs. The exact arithmetic here is load-bearing for the next-fire
    /// computation; see the scenario table in `tests/schedule_next.rs`
    /// before changing it.
    pub fn resolve(&self, value: i64) -> i64 {
        match self {
            Resolver::Everytime => 0,
            Resolver::Fixed { max, at } => diff(value, *at, *at, *max),
            Resolver::Range { max, from, to } => {
                // the window is inclusive on both edges; a strict upper
                // check would hand back a negative distance at `to`
                if value > *from && value <= *to {
                    return 0;
                }

                diff(value, *from, *to, *max)
            }
            Resolver::Step { max, steps } => steps
                .iter()
                .map(|step| diff(value, *step, *step, *max))
                .min()
                .unwrap_or(0),
        }
    }
}

fn diff(value: i64, from: i64, to: i64, max: i64) -> i64 {
    if value > to {
        return from + max - value;
    }

    from - value
}

/// Concrete values of a `from..=to` window walked with the given frequency.
/// A non-positive frequency or an inverted window yields an empty list.
pub(crate) fn value_range(from: i64, to: i64, frequency: i64) -> Vec<i64> {
    if frequency <= 0 || from > to {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(((to - from) / frequency + 1) as usize);
    let mut value = from;

    while value <= to {
        out.push(value);
        value += frequency;
    }

    out
}
