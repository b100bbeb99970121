// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The crate only emits through the `tracing` facade, so hosts that already
//! install a subscriber can ignore this module entirely. [`init`] is a
//! convenience for binaries and examples:
//! 1. `CRONLOOP_LOG` environment variable (e.g. "info", "debug")
//! 2. default to `info`
//!
//! Logs go to STDERR so stdout stays free for the host application.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global tracing subscriber. Safe to call once at startup; fails
/// if another subscriber is already installed.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_env("CRONLOOP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("installing tracing subscriber: {err}"))
}
