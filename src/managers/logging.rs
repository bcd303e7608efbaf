//! Logging setup
//!
//! Always logs to stdout with timestamps, since the process normally runs in
//! a container. With a log directory configured, also writes a daily-rotated
//! log file.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "pg-backup";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for rotated log files; stdout only when unset
    pub log_directory: Option<PathBuf>,
    pub log_level: Level,
    /// Maximum number of log files to keep
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: None,
            log_level: Level::INFO,
            max_files: 10,
        }
    }
}

impl LoggingConfig {
    /// Create from resolved settings values
    pub fn from_config(log_directory: Option<&Path>, log_level: &str, max_files: u32) -> Self {
        let level = match log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        Self {
            log_directory: log_directory.map(Path::to_path_buf),
            log_level: level,
            max_files,
        }
    }
}

/// Initialize logging
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining file logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_target(false)
        .with_level(true)
        .with_filter(level_filter(config.log_level));

    let Some(ref log_dir) = config.log_directory else {
        tracing_subscriber::registry().with(console_layer).init();
        return Ok(LogGuard { _file_guard: None });
    };

    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        log_dir,
        format!("{}.log", LOG_FILE_PREFIX),
    );
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_target(true)
        .with_filter(level_filter(config.log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    cleanup_old_logs(log_dir, config.max_files)?;

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// `RUST_LOG` wins; otherwise everything at `level`
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Cleanup old log files, keeping only the most recent N files
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_FILE_PREFIX) && name.contains(".log")
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(max_files as usize) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("Removed old log file: {:?}", file.path());
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}
