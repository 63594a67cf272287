//! Logging Infrastructure
//!
//! Console output by default; daily rolling files when a log directory is
//! configured. `RUST_LOG` takes precedence over the configured level.

use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::core::Config;

/// Initialize the logger from the service config
pub fn init_from_config(config: &Config) {
    init_logger_with_file(
        Some(&config.log_level),
        config.log_json,
        config.log_dir.as_deref(),
    );
}

/// Initialize the logger with optional JSON format and file output
///
/// Calling it again after a subscriber is installed only logs a notice.
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let file_appender = log_dir.and_then(|dir| {
        let path = Path::new(dir);
        match std::fs::create_dir_all(path) {
            Ok(()) => Some(tracing_appender::rolling::daily(path, "passcard-server")),
            Err(e) => {
                eprintln!("Log directory {} unavailable, logging to console: {}", dir, e);
                None
            }
        }
    });

    let result = match (json, file_appender) {
        (true, Some(appender)) => builder.json().with_writer(appender).try_init(),
        (true, None) => builder.json().try_init(),
        (false, Some(appender)) => builder.with_writer(appender).try_init(),
        (false, None) => builder.try_init(),
    };
    if result.is_err() {
        tracing::debug!("Logger already initialized");
    }
}
