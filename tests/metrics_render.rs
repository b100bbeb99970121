// tests/metrics_render.rs

//! In-memory metrics registry and its Prometheus text rendering.

use std::time::Duration;

use cronloop::metrics::LATENCY_BUCKETS;
use cronloop::{InMemoryMetrics, Metrics};

#[test]
fn counters_accumulate_per_id() {
    let metrics = InMemoryMetrics::new();

    metrics.inc_scheduler_next_calls();
    metrics.inc_scheduler_next_calls();
    metrics.inc_selector_select_calls();
    metrics.inc_selector_select_errors();
    metrics.inc_executor_exec_calls("a");
    metrics.inc_executor_exec_calls("a");
    metrics.inc_executor_exec_calls("b");
    metrics.inc_executor_exec_errors("a");
    metrics.inc_executor_next_calls("b");

    assert_eq!(metrics.scheduler_next_calls(), 2);
    assert_eq!(metrics.selector_select_calls(), 1);
    assert_eq!(metrics.selector_select_errors(), 1);
    assert_eq!(metrics.executor_exec_calls("a"), 2);
    assert_eq!(metrics.executor_exec_calls("b"), 1);
    assert_eq!(metrics.executor_exec_errors("a"), 1);
    assert_eq!(metrics.executor_exec_errors("b"), 0);
    assert_eq!(metrics.executor_next_calls("b"), 1);
}

#[test]
fn up_gauge_toggles() {
    let metrics = InMemoryMetrics::new();
    assert!(!metrics.up());

    metrics.is_up(true);
    assert!(metrics.up());
    assert!(metrics.render().contains("cron_up 1"));

    metrics.is_up(false);
    assert!(!metrics.up());
    assert!(metrics.render().contains("cron_up 0"));
}

#[test]
fn latency_lands_in_cumulative_buckets() {
    let metrics = InMemoryMetrics::new();

    metrics.observe_exec_latency("job", Duration::from_millis(2));
    metrics.observe_exec_latency("job", Duration::from_millis(40));
    metrics.observe_exec_latency("job", Duration::from_secs(30));

    assert_eq!(metrics.executor_exec_latency_count("job"), 3);

    let rendered = metrics.render();

    // 2 ms falls into the 0.0025 bucket, 40 ms into 0.05; the 30 s outlier
    // only shows up in +Inf
    assert!(rendered.contains("executor_exec_latency_bucket{id=\"job\",le=\"0.0025\"} 1"));
    assert!(rendered.contains("executor_exec_latency_bucket{id=\"job\",le=\"0.05\"} 2"));
    assert!(rendered.contains("executor_exec_latency_bucket{id=\"job\",le=\"10\"} 2"));
    assert!(rendered.contains("executor_exec_latency_bucket{id=\"job\",le=\"+Inf\"} 3"));
    assert!(rendered.contains("executor_exec_latency_count{id=\"job\"} 3"));
}

#[test]
fn render_covers_the_whole_surface() {
    let metrics = InMemoryMetrics::new();

    metrics.inc_executor_exec_calls("tick");
    metrics.inc_executor_next_calls("tick");
    metrics.observe_exec_latency("tick", Duration::from_millis(1));

    let rendered = metrics.render();

    for name in [
        "scheduler_next_calls_total",
        "selector_select_calls_total",
        "selector_select_errors_total",
        "executor_exec_calls_total",
        "executor_exec_errors_total",
        "executor_next_calls_total",
        "executor_exec_latency",
        "cron_up",
    ] {
        assert!(
            rendered.contains(&format!("# TYPE {name} ")),
            "missing {name} in:\n{rendered}",
        );
    }

    // next-call and exec-call counters stay distinct metrics
    assert!(rendered.contains("executor_exec_calls_total{id=\"tick\"} 1"));
    assert!(rendered.contains("executor_next_calls_total{id=\"tick\"} 1"));

    // one rendered line per configured bucket, plus +Inf
    let bucket_lines = rendered
        .lines()
        .filter(|line| line.starts_with("executor_exec_latency_bucket"))
        .count();
    assert_eq!(bucket_lines, LATENCY_BUCKETS.len() + 1);
}
