//! Logging initialization and configuration.
//!
//! Diagnostics go to two places:
//! - stderr, at `info` (or `debug` with `--verbose`), so stdout carries only
//!   the answer
//! - a per-run file under `~/.term-assistant/logs/`, always at `debug`
//!
//! Either level can be overridden with the `RUST_LOG` environment variable.
//! This is separate from the session log, which records interactions.

use std::fs;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::home_dir;

/// Initialize the logging system.
///
/// Each run creates a new log file with a timestamp, e.g.:
/// `~/.term-assistant/logs/term-assistant.2024-12-06-14-30-25.log`
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the whole run. `None` means file logging could not be set up and only
/// stderr is used.
pub fn init_logging(verbose: bool) -> Option<WorkerGuard> {
    let stderr_level = if verbose { "debug" } else { "info" };
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(stderr_level));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(stderr_filter);

    let log_dir = home_dir().join(".term-assistant").join("logs");
    let log_file = fs::create_dir_all(&log_dir).and_then(|_| {
        // Format: term-assistant.2024-12-06-14-30-25.log
        let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
        fs::File::create(log_dir.join(format!("term-assistant.{timestamp}.log")))
    });

    match log_file {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let file_filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
            let file_layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No ANSI colors in log files
                .with_target(true)
                .with_line_number(true)
                .with_filter(file_filter);

            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry().with(stderr_layer).init();
            tracing::warn!("Failed to create log file in {}: {}", log_dir.display(), e);
            None
        }
    }
}
