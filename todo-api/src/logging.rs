//! Console and rolling file log output.

use anyhow::Context;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// File name prefix; the rolling appender appends the date.
pub const LOG_FILE_NAME: &str = "todo-api.log";

/// Installs the global subscriber: console output plus a daily rolling file in
/// `log_directory`. Buffered file lines are flushed when the guard is dropped,
/// so hold it until shutdown.
pub fn init(log_directory: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_directory).with_context(|| {
        format!("Cannot create log directory '{}'", log_directory.display())
    })?;
    let (file_writer, guard) = file_writer(log_directory);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;
    Ok(guard)
}

fn file_writer(log_directory: &Path) -> (NonBlocking, WorkerGuard) {
    tracing_appender::non_blocking(tracing_appender::rolling::daily(
        log_directory,
        LOG_FILE_NAME,
    ))
}
