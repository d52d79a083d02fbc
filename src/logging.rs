//! Logging configuration using the tracing ecosystem.
//!
//! Logs go to a daily rotating file so that diagnostics never mix with the
//! JSON printed on stdout.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default log level if RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "ticketdesk=info,warn";

/// Initialize the logging system.
///
/// Sets up tracing with:
/// - Daily rotating file appender in the user's local data directory
/// - Log level configuration via `RUST_LOG` environment variable
/// - File/line numbers on every event
///
/// Logs are stored in `<local data dir>/ticketdesk/logs/`. Set
/// `RUST_LOG=ticketdesk=debug` to see every request.
///
/// The returned guard flushes buffered lines when dropped; keep it alive for
/// the whole run.
///
/// # Errors
///
/// Returns an error if:
/// - The log directory cannot be determined or created
/// - The tracing subscriber cannot be set
pub fn init() -> anyhow::Result<WorkerGuard> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "ticketdesk.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ticketdesk starting");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(guard)
}

/// Get the log directory path.
fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("ticketdesk").join("logs"))
}

/// Get the path where logs are stored, for display to users.
pub fn log_directory() -> Option<PathBuf> {
    get_log_directory().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_has_expected_structure() {
        if let Some(dir) = log_directory() {
            assert!(dir.ends_with("ticketdesk/logs"));
        }
    }
}
