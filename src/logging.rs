//! File logging. The terminal is in raw mode while the UI runs, so nothing is
//! written to stdout or stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_FILE_PREFIX: &str = "tymbr.log";

/// Keep alive for the whole program; dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    pub log_dir: PathBuf,
}

pub fn init(log_dir: &Path, level: &str) -> Result<LoggingGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, file_guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{level},reqwest=warn,hyper=warn")))
        .context("Invalid log filter")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        log_dir = %log_dir.display(),
        version = env!("CARGO_PKG_VERSION"),
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
        log_dir: log_dir.to_path_buf(),
    })
}
