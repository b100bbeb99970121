// src/errors.rs

//! Crate-wide error type and helpers.

use std::fmt;

use thiserror::Error;

/// Errors raised while compiling cron expressions, building a runtime, or
/// executing jobs.
///
/// Expression and builder errors surface from [`RuntimeBuilder::build`]
/// (no runtime starts on a bad input); per-step errors are pushed onto the
/// runtime's bounded error channel.
///
/// [`RuntimeBuilder::build`]: crate::runtime::RuntimeBuilder::build
#[derive(Debug, Error)]
pub enum CronError {
    /// The cron expression was empty.
    #[error("empty cron expression")]
    EmptyInput,

    /// The cron expression contains a byte outside `[A-Za-z0-9 */,-@]`.
    #[error("invalid character {character:?} in {input:?}")]
    InvalidCharacter { character: char, input: String },

    /// The expression has a number of fields other than 1, 5 or 6.
    #[error("invalid number of fields: {0}")]
    InvalidNumNodes(usize),

    /// A field node is neither a star nor an alphanumeric value.
    #[error("invalid node type: {0}")]
    InvalidNodeType(&'static str),

    /// A node carries an unexpected number of child nodes.
    #[error("invalid number of child nodes: {0}")]
    InvalidNumEdges(usize),

    /// An `@` override names an unknown frequency.
    #[error("invalid frequency: {0:?}")]
    InvalidFrequency(String),

    /// A value could not be read as a number where one was required.
    #[error("unsupported alphanumeric value: {0:?}")]
    UnsupportedAlphanum(String),

    /// A numeric value falls outside the field's range.
    #[error("out-of-bounds value [{value}]: min: {min}; max: {max}")]
    OutOfBoundsAlphanum { value: i64, min: i64, max: i64 },

    /// A name is not in the field's closed name list, or a symbol carries a
    /// malformed partner value.
    #[error("invalid alphanumeric value: {0:?}")]
    InvalidAlphanum(String),

    /// An alphanumeric token ended up empty.
    #[error("empty alphanumeric value")]
    EmptyAlphanum,

    /// An executor was constructed without runners.
    #[error("empty runners list")]
    EmptyRunnerList,

    /// An executor was constructed without a schedule.
    #[error("empty scheduler")]
    EmptyScheduler,

    /// A selector was constructed without executors.
    #[error("empty executors list")]
    EmptyExecutorsList,

    /// A runtime was built without a selector and without jobs.
    #[error("empty task selector")]
    EmptySelector,

    /// The driving context was cancelled while a job was waiting or running.
    #[error("job cancelled")]
    Cancelled,

    /// One or more runners of a job failed; every failure is carried.
    #[error("job {id:?} runner error(s): {errors}")]
    TaskFailed {
        id: String,
        errors: Joined<anyhow::Error>,
    },

    /// Several independent errors reported together, e.g. validation
    /// problems across multiple fields.
    #[error("{0}")]
    Many(Joined<CronError>),
}

impl CronError {
    /// Collapse a list of errors into a single error value.
    ///
    /// Returns `Ok(())` for an empty list, the sole error for a singleton,
    /// and [`CronError::Many`] otherwise.
    pub fn join(mut errors: Vec<CronError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(CronError::Many(Joined(errors))),
        }
    }
}

/// A list of errors formatted as one, separated by `"; "`.
#[derive(Debug)]
pub struct Joined<E>(pub Vec<E>);

impl<E: fmt::Display> fmt::Display for Joined<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, CronError>;
