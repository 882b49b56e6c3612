//! File logging for `ytc`.
//!
//! Logs go to a daily file under `<data_local_dir>/youtrack-client/logs` so
//! command output on stdout stays clean. `RUST_LOG` overrides the filter;
//! `RUST_LOG=youtrack_client=debug` shows every request and retry.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str = "youtrack_client=info,warn";

const LOG_FILE_PREFIX: &str = "ytc.log";

/// Install the global subscriber writing to the rolling log file.
pub fn init() -> anyhow::Result<()> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;
    let log_dir = log_dir_under(&base_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ytc started");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(())
}

fn log_dir_under(base: &Path) -> PathBuf {
    base.join("youtrack-client").join("logs")
}

pub fn shutdown() {
    tracing::info!("ytc finished");
}
