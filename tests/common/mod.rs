// tests/common/mod.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use chrono::{Timelike, Utc};
use cronloop::{CancellationToken, CronError, Runner};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing**
///   tests (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g. `RUST_LOG=debug cargo test`.
#[allow(dead_code)]
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Runner that records a marker value into a shared list and optionally
/// fails with a fixed message.
pub struct TestRunner {
    pub value: i32,
    pub seen: Arc<Mutex<Vec<i32>>>,
    pub error: Option<String>,
}

impl TestRunner {
    #[allow(dead_code)]
    pub fn ok(value: i32, seen: &Arc<Mutex<Vec<i32>>>) -> Arc<dyn Runner> {
        Arc::new(Self {
            value,
            seen: Arc::clone(seen),
            error: None,
        })
    }

    #[allow(dead_code)]
    pub fn failing(value: i32, seen: &Arc<Mutex<Vec<i32>>>, message: &str) -> Arc<dyn Runner> {
        Arc::new(Self {
            value,
            seen: Arc::clone(seen),
            error: Some(message.to_string()),
        })
    }
}

impl Runner for TestRunner {
    fn run<'a>(
        &'a self,
        _ctx: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(self.value);

            match &self.error {
                Some(message) => Err(anyhow::anyhow!(message.clone())),
                None => Ok(()),
            }
        })
    }
}

/// Sleep until shortly after the next wall-clock second boundary.
///
/// Per-second schedules then fire deterministically inside the test drive
/// windows: a 1005 ms window holds exactly one boundary, a 2100 ms window
/// exactly two.
#[allow(dead_code)]
pub async fn align_to_second() {
    let now = Utc::now();
    let to_boundary = 1_000_000_000u32.saturating_sub(now.nanosecond());

    tokio::time::sleep(Duration::from_nanos(u64::from(to_boundary)) + Duration::from_millis(10))
        .await;
}

/// Collect everything currently readable from the error channel.
#[allow(dead_code)]
pub async fn drain_errors(rx: &mut mpsc::Receiver<CronError>) -> Vec<CronError> {
    let mut out = Vec::new();

    while let Ok(Some(err)) = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
        out.push(err);
    }

    out
}
