// src/executor.rs

//! Job executor: one schedule paired with a group of runners.
//!
//! An [`Executor`] owns a [`CronScheduler`] and an ordered list of
//! [`Runner`]s. Each `exec` cycle computes the next fire instant, waits for
//! it (or for cancellation), then invokes every runner in registration
//! order, joining all failures into one error. Executors are built once and
//! are immutable for the lifetime of the runtime.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::clock::{Clock, SystemClock};
use crate::errors::{CronError, Joined, Result};
use crate::metrics::{Metrics, NoOpMetrics};
use crate::schedule::CronScheduler;

/// Executor ID used when none is supplied.
pub const DEFAULT_ID: &str = "cronloop.executor";

/// Guard sleep added on top of the residual when the timer wakes before the
/// target instant, so runners always observe the scheduled second.
const BUFFER_PERIOD: Duration = Duration::from_millis(100);

/// A unit of work fired by an [`Executor`].
///
/// Runners receive the cancellation token that drives the whole runtime and
/// are expected to honor it in long-running work. A `Err` return marks the
/// cycle as failed; failures from all runners of a cycle are joined.
///
/// Any `Fn(CancellationToken) -> impl Future<Output = anyhow::Result<()>>`
/// closure is a runner.
pub trait Runner: Send + Sync {
    fn run<'a>(
        &'a self,
        ctx: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}

impl<F, Fut> Runner for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn run<'a>(
        &'a self,
        ctx: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin((self)(ctx.clone()))
    }
}

/// Runner that does nothing, successfully. Stands in where a job slot must
/// exist but no work is wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRunner;

impl Runner for NoopRunner {
    fn run<'a>(
        &'a self,
        _ctx: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

/// Contract between the selector and executors.
///
/// `exec` owns the whole fire cycle, waiting included; it is not the
/// selector's job to sleep until a job is due. `next_at` and `id` expose
/// the details the selector needs for ordering and labels.
pub trait Execute: Send + Sync {
    /// Wait for the next scheduled instant after `now`, then run the task
    /// group, returning the joined runner failures if any.
    fn exec<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        now: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// The next fire instant strictly after `now`.
    fn next_at(&self, now: DateTime<Utc>) -> DateTime<Utc>;

    /// ID used in logs and metric labels.
    fn id(&self) -> &str;
}

/// Schedule-driven [`Execute`] implementation.
pub struct Executor {
    id: String,
    scheduler: CronScheduler,
    runners: Vec<Arc<dyn Runner>>,
    metrics: Arc<dyn Metrics>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("id", &self.id)
            .field("scheduler", &self.scheduler)
            .field("runners", &self.runners.len())
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Executor firing `runners` on `scheduler`'s cadence.
    ///
    /// An empty `id` falls back to [`DEFAULT_ID`]; an empty runner list is
    /// rejected.
    pub fn new(
        id: impl Into<String>,
        scheduler: CronScheduler,
        runners: Vec<Arc<dyn Runner>>,
    ) -> Result<Self> {
        if runners.is_empty() {
            return Err(CronError::EmptyRunnerList);
        }

        let mut id = id.into();
        if id.is_empty() {
            id = DEFAULT_ID.to_string();
        }

        Ok(Self {
            id,
            scheduler,
            runners,
            metrics: Arc::new(NoOpMetrics),
            clock: Arc::new(SystemClock),
        })
    }

    /// Compile `expr` and build an executor around it. An empty expression
    /// is rejected as a missing scheduler.
    pub fn with_cron(
        id: impl Into<String>,
        expr: &str,
        runners: Vec<Arc<dyn Runner>>,
    ) -> Result<Self> {
        if expr.is_empty() {
            return Err(CronError::EmptyScheduler);
        }

        Self::new(id, CronScheduler::parse(expr)?, runners)
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.scheduler = self.scheduler.with_metrics(Arc::clone(&metrics));
        self.metrics = metrics;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn exec_cycle(&self, ctx: &CancellationToken, now: DateTime<Utc>) -> Result<()> {
        self.metrics.inc_executor_exec_calls(&self.id);
        info!(id = %self.id, "executing task");

        let started = std::time::Instant::now();
        let result = self.wait_and_run(ctx, now).await;

        // latency is observed on every outcome, cancellation included
        self.metrics.observe_exec_latency(&self.id, started.elapsed());

        result
    }

    async fn wait_and_run(&self, ctx: &CancellationToken, now: DateTime<Utc>) -> Result<()> {
        let next = self.scheduler.next(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = ctx.cancelled() => {
                self.metrics.inc_executor_exec_errors(&self.id);
                warn!(id = %self.id, "task cancelled");

                return Err(CronError::Cancelled);
            }
            _ = tokio::time::sleep(wait) => {}
        }

        // A timer can wake a hair early; sleeping the residual plus a buffer
        // guarantees the runners observe the target second, and the
        // selector's trailing step keeps this from double-firing.
        let woke = self.clock.now();
        if woke < next {
            let residual = (next - woke).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(residual + BUFFER_PERIOD).await;
        }

        let mut failures = Vec::new();

        for runner in &self.runners {
            if let Err(err) = runner.run(ctx).await {
                failures.push(err);
            }
        }

        if !failures.is_empty() {
            self.metrics.inc_executor_exec_errors(&self.id);
            error!(
                id = %self.id,
                num_errors = failures.len(),
                "task execution error(s)"
            );

            return Err(CronError::TaskFailed {
                id: self.id.clone(),
                errors: Joined(failures),
            });
        }

        Ok(())
    }
}

impl Execute for Executor {
    fn exec<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        now: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let span = info_span!("executor.exec", id = %self.id);

        Box::pin(self.exec_cycle(ctx, now).instrument(span))
    }

    fn next_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let _span = info_span!("executor.next", id = %self.id).entered();
        self.metrics.inc_executor_next_calls(&self.id);

        let next = self.scheduler.next(now);
        debug!(id = %self.id, at = %next, "next job");

        next
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Fire several executors that share an instant, in parallel, joining their
/// errors. Used by selectors when a cohort of executors is due at once.
pub async fn run_all(
    ctx: &CancellationToken,
    now: DateTime<Utc>,
    execs: &[Arc<dyn Execute>],
) -> Result<()> {
    let mut set = JoinSet::new();

    for exec in execs {
        let exec = Arc::clone(exec);
        let ctx = ctx.clone();

        set.spawn(async move { exec.exec(&ctx, now).await });
    }

    let mut failures = Vec::new();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => failures.push(err),
            // a panicked executor task still counts as a failed cycle
            Err(err) => failures.push(CronError::TaskFailed {
                id: DEFAULT_ID.to_string(),
                errors: Joined(vec![anyhow::Error::from(err)]),
            }),
        }
    }

    CronError::join(failures)
}
