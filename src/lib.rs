// src/lib.rs

//! # cronloop: an embeddable cron-style job scheduler
//!
//! A host application registers jobs — each a cron expression bound to one
//! or more async runners — with a [`Runtime`] built through
//! [`Runtime::builder`], then drives [`Runtime::run`] on a task it owns.
//! The runtime fires jobs at their scheduled times and surfaces runner
//! errors through a bounded error channel.
//!
//! Expressions support the classic five fields, an optional leading seconds
//! field, and the `@hourly` / `@daily` / `@weekly` / `@monthly` /
//! `@yearly` overrides. Month and weekday names (`JAN..DEC`, `SUN..SAT`)
//! are accepted case-insensitively, and weekday `7` is an alias for Sunday.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cronloop::{CancellationToken, Runner, Runtime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cronloop::CronError> {
//!     let mut runtime = Runtime::builder()
//!         .job(
//!             "heartbeat",
//!             "*/5 * * * * *",
//!             vec![Arc::new(|_ctx: CancellationToken| async move {
//!                 println!("tick");
//!                 anyhow::Ok(())
//!             }) as Arc<dyn Runner>],
//!         )
//!         .build()?;
//!
//!     let mut errors = runtime.errors().expect("errors taken once");
//!     tokio::spawn(async move {
//!         while let Some(err) = errors.recv().await {
//!             eprintln!("job error: {err}");
//!         }
//!     });
//!
//!     let ctx = CancellationToken::new();
//!     runtime.run(ctx).await;
//!
//!     Ok(())
//! }
//! ```
//!
//! Compiled schedules are usable on their own, without a runtime:
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use cronloop::schedule::CronScheduler;
//!
//! let scheduler = CronScheduler::parse("0 0 * * *")?;
//! let now = Utc.with_ymd_and_hms(2023, 10, 30, 22, 12, 43).unwrap();
//!
//! assert_eq!(
//!     scheduler.next(now),
//!     Utc.with_ymd_and_hms(2023, 10, 31, 0, 0, 0).unwrap(),
//! );
//! # Ok::<(), cronloop::CronError>(())
//! ```

pub mod clock;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod schedule;
pub mod selector;

pub use clock::{Clock, SystemClock};
pub use errors::{CronError, Result};
pub use executor::{Execute, Executor, NoopRunner, Runner};
pub use metrics::{InMemoryMetrics, Metrics, NoOpMetrics};
pub use runtime::{Runtime, RuntimeBuilder};
pub use schedule::{parse, CronScheduler, Resolver, Schedule};
pub use selector::{BlockingSelector, NonBlockingSelector, Select};

// Re-export so hosts don't need a direct tokio-util dependency for the
// cancellation plumbing.
pub use tokio_util::sync::CancellationToken;
