// src/metrics.rs

//! Metrics sink interface and bundled implementations.
//!
//! The scheduling pipeline reports counters, one latency histogram and an
//! up/down gauge through the [`Metrics`] trait. Hosts bridge it to their
//! own registry via [`RuntimeBuilder::metrics`]; [`NoOpMetrics`] is the
//! default. [`InMemoryMetrics`] collects everything in process and can
//! render the Prometheus text exposition format for embedding into an
//! existing scrape endpoint.
//!
//! [`RuntimeBuilder::metrics`]: crate::runtime::RuntimeBuilder::metrics

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Sink for scheduling metrics. Implementations must be internally
/// thread-safe; every method may be called from concurrent tasks.
///
/// Implementations backed by an exemplar-capable registry should attach the
/// active trace ID to latency observations when one is present.
pub trait Metrics: Send + Sync {
    /// Count of next-fire computations by the scheduler
    /// (`scheduler_next_calls_total`).
    fn inc_scheduler_next_calls(&self);
    /// Count of selection rounds (`selector_select_calls_total`).
    fn inc_selector_select_calls(&self);
    /// Count of selection rounds that surfaced an error
    /// (`selector_select_errors_total`).
    fn inc_selector_select_errors(&self);
    /// Count of exec cycles per executor (`executor_exec_calls_total{id}`).
    fn inc_executor_exec_calls(&self, id: &str);
    /// Count of failed exec cycles, runner failure or cancellation
    /// (`executor_exec_errors_total{id}`).
    fn inc_executor_exec_errors(&self, id: &str);
    /// Count of next-fire lookups through an executor
    /// (`executor_next_calls_total{id}`).
    fn inc_executor_next_calls(&self, id: &str);
    /// Duration of one exec cycle (`executor_exec_latency{id}`), observed
    /// on every outcome.
    fn observe_exec_latency(&self, id: &str, latency: Duration);
    /// Whether the runtime loop is running (`cron_up`).
    fn is_up(&self, up: bool);
}

/// Sink that drops every observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetrics;

impl Metrics for NoOpMetrics {
    fn inc_scheduler_next_calls(&self) {}
    fn inc_selector_select_calls(&self) {}
    fn inc_selector_select_errors(&self) {}
    fn inc_executor_exec_calls(&self, _id: &str) {}
    fn inc_executor_exec_errors(&self, _id: &str) {}
    fn inc_executor_next_calls(&self, _id: &str) {}
    fn observe_exec_latency(&self, _id: &str, _latency: Duration) {}
    fn is_up(&self, _up: bool) {}
}

/// Bucket upper bounds of `executor_exec_latency`, in seconds.
pub const LATENCY_BUCKETS: [f64; 17] = [
    1e-5, 5e-5, 1e-4, 5e-4, 1e-3, 2.5e-3, 5e-3, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
    5.0, 10.0,
];

/// Cumulative histogram over [`LATENCY_BUCKETS`].
#[derive(Debug, Default, Clone)]
struct Histogram {
    buckets: [u64; LATENCY_BUCKETS.len()],
    sum: f64,
    count: u64,
}

impl Histogram {
    fn observe(&mut self, seconds: f64) {
        for (bucket, bound) in self.buckets.iter_mut().zip(LATENCY_BUCKETS) {
            if seconds <= bound {
                *bucket += 1;
            }
        }

        self.sum += seconds;
        self.count += 1;
    }
}

/// In-process metrics registry.
///
/// Counters use atomics; the per-executor maps sit behind plain mutexes,
/// held only for the increment.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    scheduler_next_calls: AtomicU64,
    selector_select_calls: AtomicU64,
    selector_select_errors: AtomicU64,
    executor_exec_calls: Mutex<HashMap<String, u64>>,
    executor_exec_errors: Mutex<HashMap<String, u64>>,
    executor_next_calls: Mutex<HashMap<String, u64>>,
    executor_exec_latency: Mutex<HashMap<String, Histogram>>,
    up: AtomicBool,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduler_next_calls(&self) -> u64 {
        self.scheduler_next_calls.load(Ordering::Relaxed)
    }

    pub fn selector_select_calls(&self) -> u64 {
        self.selector_select_calls.load(Ordering::Relaxed)
    }

    pub fn selector_select_errors(&self) -> u64 {
        self.selector_select_errors.load(Ordering::Relaxed)
    }

    pub fn executor_exec_calls(&self, id: &str) -> u64 {
        read(&self.executor_exec_calls, id)
    }

    pub fn executor_exec_errors(&self, id: &str) -> u64 {
        read(&self.executor_exec_errors, id)
    }

    pub fn executor_next_calls(&self, id: &str) -> u64 {
        read(&self.executor_next_calls, id)
    }

    /// Number of latency observations recorded for `id`.
    pub fn executor_exec_latency_count(&self, id: &str) -> u64 {
        lock(&self.executor_exec_latency)
            .get(id)
            .map_or(0, |histogram| histogram.count)
    }

    pub fn up(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();

        counter(
            &mut out,
            "scheduler_next_calls_total",
            "Count of time calculations for the following scheduled task",
            self.scheduler_next_calls(),
        );
        counter(
            &mut out,
            "selector_select_calls_total",
            "Count of selections done between multiple executors, for the next task",
            self.selector_select_calls(),
        );
        counter(
            &mut out,
            "selector_select_errors_total",
            "Count of errors when selecting the next task out of multiple executors",
            self.selector_select_errors(),
        );
        labelled_counter(
            &mut out,
            "executor_exec_calls_total",
            "Count of executions from a single executor, identified by its ID",
            &lock(&self.executor_exec_calls),
        );
        labelled_counter(
            &mut out,
            "executor_exec_errors_total",
            "Count of execution errors from a single executor, identified by its ID",
            &lock(&self.executor_exec_errors),
        );
        labelled_counter(
            &mut out,
            "executor_next_calls_total",
            "Count of calls to retrieve the next execution time",
            &lock(&self.executor_next_calls),
        );
        histogram(
            &mut out,
            "executor_exec_latency",
            "Histogram of execution times",
            &lock(&self.executor_exec_latency),
        );

        let _ = writeln!(out, "# HELP cron_up Signals whether the scheduler is running or not");
        let _ = writeln!(out, "# TYPE cron_up gauge");
        let _ = writeln!(out, "cron_up {}", u8::from(self.up()));

        out
    }
}

impl Metrics for InMemoryMetrics {
    fn inc_scheduler_next_calls(&self) {
        self.scheduler_next_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_selector_select_calls(&self) {
        self.selector_select_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_selector_select_errors(&self) {
        self.selector_select_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_executor_exec_calls(&self, id: &str) {
        *lock(&self.executor_exec_calls).entry(id.to_string()).or_default() += 1;
    }

    fn inc_executor_exec_errors(&self, id: &str) {
        *lock(&self.executor_exec_errors).entry(id.to_string()).or_default() += 1;
    }

    fn inc_executor_next_calls(&self, id: &str) {
        *lock(&self.executor_next_calls).entry(id.to_string()).or_default() += 1;
    }

    fn observe_exec_latency(&self, id: &str, latency: Duration) {
        lock(&self.executor_exec_latency)
            .entry(id.to_string())
            .or_default()
            .observe(latency.as_secs_f64());
    }

    fn is_up(&self, up: bool) {
        self.up.store(up, Ordering::Relaxed);
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read(map: &Mutex<HashMap<String, u64>>, id: &str) -> u64 {
    lock(map).get(id).copied().unwrap_or(0)
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}

fn labelled_counter(out: &mut String, name: &str, help: &str, values: &HashMap<String, u64>) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");

    let mut ids: Vec<_> = values.keys().collect();
    ids.sort();

    for id in ids {
        let _ = writeln!(out, "{name}{{id=\"{id}\"}} {}", values[id]);
    }
}

fn histogram(out: &mut String, name: &str, help: &str, values: &HashMap<String, Histogram>) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} histogram");

    let mut ids: Vec<_> = values.keys().collect();
    ids.sort();

    for id in ids {
        let histogram = &values[id];

        for (bucket, bound) in histogram.buckets.iter().zip(LATENCY_BUCKETS) {
            let _ = writeln!(out, "{name}_bucket{{id=\"{id}\",le=\"{bound}\"}} {bucket}");
        }

        let _ = writeln!(out, "{name}_bucket{{id=\"{id}\",le=\"+Inf\"}} {}", histogram.count);
        let _ = writeln!(out, "{name}_sum{{id=\"{id}\"}} {}", histogram.sum);
        let _ = writeln!(out, "{name}_count{{id=\"{id}\"}} {}", histogram.count);
    }
}
