// src/runtime.rs

//! Runtime: the loop that drives a selector until cancellation, plus the
//! builder that wires jobs, selector, metrics and the error channel
//! together.
//!
//! All expression and configuration problems surface from
//! [`RuntimeBuilder::build`], joined, so a bad cron string never starts a
//! runtime. Per-step errors (runner failures, cancellation surfacing inside
//! an exec) are pushed best-effort onto a bounded error channel; when the
//! channel is full, surplus errors are dropped after the executor has
//! already logged and counted them.

use std::fmt;
use std::sync::Arc;

use chrono_tz::Tz;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::clock::{Clock, SystemClock};
use crate::errors::{CronError, Result};
use crate::executor::{Execute, Executor, Runner};
use crate::metrics::{Metrics, NoOpMetrics};
use crate::schedule::CronScheduler;
use crate::selector::{NonBlockingSelector, Select};

/// Default error channel capacity.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Smallest error channel capacity handed out.
pub const MIN_BUFFER_SIZE: usize = 64;

/// Drives the scheduling loop and surfaces job errors.
///
/// One `Runtime` supports one run cycle: [`Runtime::run`] loops until the
/// given token is cancelled. Errors are read from the channel returned by
/// [`Runtime::errors`].
pub struct Runtime {
    selector: Box<dyn Select>,
    err_tx: mpsc::Sender<CronError>,
    err_rx: Option<mpsc::Receiver<CronError>>,
    metrics: Arc<dyn Metrics>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("errors_taken", &self.err_rx.is_none())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Take the receiving end of the bounded error channel.
    ///
    /// The channel has a single consumer; the first call returns it and
    /// later calls return `None`.
    pub fn errors(&mut self) -> Option<mpsc::Receiver<CronError>> {
        self.err_rx.take()
    }

    /// Drive the scheduling loop until `ctx` is cancelled.
    ///
    /// This blocks the calling task; hosts usually spawn it. Every selector
    /// error is pushed best-effort onto the error channel.
    pub async fn run(&self, ctx: CancellationToken) {
        let span = info_span!("runtime.run");

        async {
            info!("starting cron");
            self.metrics.is_up(true);

            loop {
                if ctx.is_cancelled() {
                    break;
                }

                if let Err(err) = self.selector.next(&ctx).await {
                    self.forward(err);
                }
            }

            info!("closing cron");
            self.metrics.is_up(false);
        }
        .instrument(span)
        .await;
    }

    fn forward(&self, err: CronError) {
        match self.err_tx.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(err)) => {
                warn!(error = %err, "error channel full; dropping error");
            }
            Err(TrySendError::Closed(err)) => {
                debug!(error = %err, "error channel closed; dropping error");
            }
        }
    }
}

/// One `job(...)` registration, compiled at build time.
struct JobSpec {
    id: String,
    expr: String,
    runners: Vec<Arc<dyn Runner>>,
}

/// Builder for [`Runtime`].
///
/// Either inject a preconstructed selector with
/// [`RuntimeBuilder::selector`], or register jobs with
/// [`RuntimeBuilder::job`] and let the builder assemble a
/// [`NonBlockingSelector`] over them. A supplied selector takes precedence.
pub struct RuntimeBuilder {
    selector: Option<Box<dyn Select>>,
    jobs: Vec<JobSpec>,
    tz: Tz,
    error_buffer_size: i64,
    metrics: Arc<dyn Metrics>,
    clock: Arc<dyn Clock>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            selector: None,
            jobs: Vec::new(),
            tz: chrono_tz::UTC,
            error_buffer_size: DEFAULT_BUFFER_SIZE as i64,
            metrics: Arc::new(NoOpMetrics),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a preconstructed selector instead of building one from jobs.
    pub fn selector(mut self, selector: impl Select + 'static) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    /// Register a job: a cron expression bound to a group of runners, fired
    /// in registration order. The expression is compiled during
    /// [`RuntimeBuilder::build`].
    pub fn job(
        mut self,
        id: impl Into<String>,
        expr: impl Into<String>,
        runners: Vec<Arc<dyn Runner>>,
    ) -> Self {
        self.jobs.push(JobSpec {
            id: id.into(),
            expr: expr.into(),
            runners,
        });
        self
    }

    /// Time zone the job schedules are evaluated in. Defaults to UTC.
    pub fn timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    /// Capacity of the error channel. Negative values roll over to the
    /// default of 1024; values below 64 are raised to 64.
    pub fn error_buffer_size(mut self, size: i64) -> Self {
        self.error_buffer_size = size;
        self
    }

    /// Metrics sink shared by the scheduler, executors, selector and
    /// runtime.
    pub fn metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Clock the selector and executors read. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Compile all jobs and assemble the runtime.
    ///
    /// Every problem found — unparsable expressions, empty runner groups,
    /// missing selector and jobs — is reported, joined into one error.
    pub fn build(self) -> Result<Runtime> {
        let mut errors = Vec::new();
        let mut execs: Vec<Arc<dyn Execute>> = Vec::with_capacity(self.jobs.len());

        for job in self.jobs {
            match compile_job(job, self.tz, &self.metrics, &self.clock) {
                Ok(exec) => execs.push(Arc::new(exec)),
                Err(err) => errors.push(err),
            }
        }

        let selector: Option<Box<dyn Select>> = match self.selector {
            Some(selector) => Some(selector),
            None if execs.is_empty() => {
                errors.push(CronError::EmptySelector);
                errors.push(CronError::EmptyExecutorsList);
                None
            }
            None => match NonBlockingSelector::new(execs) {
                Ok(selector) => Some(Box::new(
                    selector
                        .with_clock(Arc::clone(&self.clock))
                        .with_metrics(Arc::clone(&self.metrics)),
                )),
                Err(err) => {
                    errors.push(err);
                    None
                }
            },
        };

        CronError::join(errors)?;

        let Some(selector) = selector else {
            return Err(CronError::EmptySelector);
        };

        let size = if self.error_buffer_size < 0 {
            DEFAULT_BUFFER_SIZE
        } else if (self.error_buffer_size as usize) < MIN_BUFFER_SIZE {
            MIN_BUFFER_SIZE
        } else {
            self.error_buffer_size as usize
        };

        let (err_tx, err_rx) = mpsc::channel(size);

        Ok(Runtime {
            selector,
            err_tx,
            err_rx: Some(err_rx),
            metrics: self.metrics,
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_job(
    job: JobSpec,
    tz: Tz,
    metrics: &Arc<dyn Metrics>,
    clock: &Arc<dyn Clock>,
) -> Result<Executor> {
    if job.expr.is_empty() {
        return Err(CronError::EmptyScheduler);
    }

    let scheduler = CronScheduler::parse(&job.expr)?.with_timezone(tz);

    Ok(Executor::new(job.id, scheduler, job.runners)?
        .with_metrics(Arc::clone(metrics))
        .with_clock(Arc::clone(clock)))
}
