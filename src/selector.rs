// src/selector.rs

//! Selectors: multiplex many executors onto a single driving task.
//!
//! Both variants share the [`Select`] contract. On each call they order the
//! executors by next-fire instant and dispatch the due ones:
//!
//! - [`BlockingSelector`] runs the earliest cohort and waits for it, so the
//!   caller gets precise error information, at the cost of skipping other
//!   executors while a long run is in flight.
//! - [`NonBlockingSelector`] spawns every due executor on its own task and
//!   only waits a bounded timeout for a result to post; errors that arrive
//!   later reach the operator through the executor's own logs and metrics.
//!
//! After dispatching, both sleep the 50 ms minimum step so an early run is
//! never fired twice inside the same second.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, Instrument};

use crate::clock::{Clock, SystemClock};
use crate::errors::{CronError, Result};
use crate::executor::{run_all, Execute};
use crate::metrics::{Metrics, NoOpMetrics};

/// Trailing guard sleep after each selection step.
pub const MIN_STEP_DURATION: Duration = Duration::from_millis(50);

/// Default wait for in-flight results in the non-blocking selector.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Strategy for picking and dispatching the next job(s).
pub trait Select: Send + Sync {
    /// Dispatch the executor(s) due next. The returned error is whatever
    /// the dispatched executor surfaced within this step.
    fn next<'a>(
        &'a self,
        ctx: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Selector that waits for the dispatched cohort to finish.
pub struct BlockingSelector {
    execs: Vec<Arc<dyn Execute>>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn Metrics>,
}

impl std::fmt::Debug for BlockingSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingSelector")
            .field("execs_len", &self.execs.len())
            .finish()
    }
}

impl BlockingSelector {
    pub fn new(execs: Vec<Arc<dyn Execute>>) -> Result<Self> {
        if execs.is_empty() {
            return Err(CronError::EmptyExecutorsList);
        }

        Ok(Self {
            execs,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(NoOpMetrics),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    async fn step(&self, ctx: &CancellationToken) -> Result<()> {
        self.metrics.inc_selector_select_calls();
        debug!("selecting the next task");

        let result = self.dispatch(ctx).await;

        if let Err(err) = &result {
            self.metrics.inc_selector_select_errors();
            error!(error = %err, "failed to select and execute the next task");
        }

        // lock each step to the seconds mark
        tokio::time::sleep(MIN_STEP_DURATION).await;

        result
    }

    async fn dispatch(&self, ctx: &CancellationToken) -> Result<()> {
        let now = self.clock.now();

        if self.execs.len() == 1 {
            return self.execs[0].exec(ctx, now).await;
        }

        // stable sort: executors sharing an instant stay in registration
        // order
        let mut order: Vec<(DateTime<Utc>, usize)> = self
            .execs
            .iter()
            .enumerate()
            .map(|(index, exec)| (exec.next_at(now), index))
            .collect();
        order.sort_by_key(|&(at, _)| at);

        let earliest = order[0].0;
        let cohort: Vec<Arc<dyn Execute>> = order
            .iter()
            .take_while(|&&(at, _)| at == earliest)
            .map(|&(_, index)| Arc::clone(&self.execs[index]))
            .collect();

        if cohort.len() == 1 {
            return cohort[0].exec(ctx, now).await;
        }

        run_all(ctx, now, &cohort).await
    }
}

impl Select for BlockingSelector {
    fn next<'a>(
        &'a self,
        ctx: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let span = info_span!("selector.select", kind = "blocking");

        Box::pin(self.step(ctx).instrument(span))
    }
}

/// Selector that dispatches due executors on their own tasks and returns
/// after a bounded wait.
pub struct NonBlockingSelector {
    execs: Vec<Arc<dyn Execute>>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn Metrics>,
}

impl NonBlockingSelector {
    pub fn new(execs: Vec<Arc<dyn Execute>>) -> Result<Self> {
        if execs.is_empty() {
            return Err(CronError::EmptyExecutorsList);
        }

        Ok(Self {
            execs,
            timeout: DEFAULT_TIMEOUT,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(NoOpMetrics),
        })
    }

    /// Bound the wait for in-flight results. Values below the minimum step
    /// duration fall back to the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout < MIN_STEP_DURATION {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    async fn step(&self, ctx: &CancellationToken) -> Result<()> {
        self.metrics.inc_selector_select_calls();
        debug!("selecting the next task");

        let result = self.dispatch(ctx).await;

        if let Err(err) = &result {
            self.metrics.inc_selector_select_errors();
            error!(error = %err, "failed to select and execute the next task");
        }

        // lock each step to the seconds mark
        tokio::time::sleep(MIN_STEP_DURATION).await;

        result
    }

    async fn dispatch(&self, ctx: &CancellationToken) -> Result<()> {
        let now = self.clock.now();
        let (tx, mut rx) = mpsc::channel::<CronError>(self.execs.len());

        // only executors due within the step window get a task; everything
        // else is re-examined on the next step
        for exec in &self.execs {
            let eta = exec.next_at(now) - now;
            debug!(id = exec.id(), eta = %eta, "checking task to execute");

            if eta.num_milliseconds() < MIN_STEP_DURATION.as_millis() as i64 {
                self.spawn_exec(exec, ctx, now, &tx);
            }
        }

        // the spawned tasks hold the only senders now; a clean round closes
        // the channel without a value
        drop(tx);

        tokio::select! {
            _ = tokio::time::sleep(self.timeout) => Ok(()),
            _ = ctx.cancelled() => Ok(()),
            received = rx.recv() => match received {
                Some(err) => Err(err),
                None => Ok(()),
            },
        }
    }

    fn spawn_exec(
        &self,
        exec: &Arc<dyn Execute>,
        ctx: &CancellationToken,
        now: DateTime<Utc>,
        tx: &mpsc::Sender<CronError>,
    ) {
        let exec = Arc::clone(exec);
        let ctx = ctx.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            if let Err(err) = exec.exec(&ctx, now).await {
                // receiver may be gone after the timeout; the executor has
                // already logged and counted the failure
                let _ = tx.send(err).await;
            }
        });
    }
}

impl Select for NonBlockingSelector {
    fn next<'a>(
        &'a self,
        ctx: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let span = info_span!("selector.select", kind = "non_blocking");

        Box::pin(self.step(ctx).instrument(span))
    }
}
