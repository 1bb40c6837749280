//! Diagnostic logging setup.
//!
//! Diagnostics go through `tracing` and never into the run transcript. They
//! are written to stderr and, when a log directory is given, to
//! `harness.log` through a non-blocking appender.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive variable, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "HARNESS_LOG";

pub const LOG_FILE: &str = "harness.log";

/// Level used when neither `HARNESS_LOG` nor `RUST_LOG` is set.
///
/// stderr shares the terminal with the live run display, so it stays at
/// `warn` unless verbose. The log file keeps `info`.
pub fn default_level(verbose: bool, console: bool) -> &'static str {
    match (verbose, console) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    }
}

/// Build a filter: `HARNESS_LOG`, then `RUST_LOG`, then `fallback`.
pub fn env_filter(fallback: &str) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to {} logging",
                LOG_ENV, err, fallback
            );
            EnvFilter::new(fallback)
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process. Installing twice is harmless; the first
/// subscriber stays.
pub fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter(default_level(verbose, true)))
        .boxed();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(env_filter(default_level(verbose, false)))
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();

    debug!(verbose, log_dir = ?log_dir, "tracing initialised");
    Ok(guard)
}
