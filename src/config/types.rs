use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure, as read from the optional TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Where dumps go and how long they are kept
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    /// Directory holding the `<timestamp>.sql.gz` artifacts
    #[serde(default = "default_backup_path")]
    pub path: PathBuf,

    /// Days of backups to keep; zero or negative keeps them forever
    #[serde(default = "default_keep_days")]
    pub keep_days: i64,

    /// PostgreSQL password file; the dump host is read from its first line
    #[serde(default)]
    pub pgpass_file: Option<PathBuf>,

    /// Program that writes the cluster dump to stdout
    #[serde(default = "default_dump_command")]
    pub dump_command: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            path: default_backup_path(),
            keep_days: default_keep_days(),
            pgpass_file: None,
            dump_command: default_dump_command(),
        }
    }
}

/// Healthcheck ping configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub healthchecks_url: Option<String>,

    #[serde(default = "default_ping_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            healthchecks_url: None,
            timeout_seconds: default_ping_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// IANA timezone name the daily schedule is anchored to
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Run one backup immediately at startup (without pruning)
    #[serde(default)]
    pub backup_at_boot: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            backup_at_boot: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSection {
    /// Also write rotated log files here
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            log_directory: None,
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
        }
    }
}

/// Values given on the command line; `None` leaves the file/default value alone
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backup_path: Option<PathBuf>,
    pub keep_days: Option<i64>,
    pub healthchecks_url: Option<String>,
    pub backup_at_boot: bool,
    pub timezone: Option<String>,
    pub pgpass_file: Option<PathBuf>,
    pub dump_command: Option<String>,
    pub log_directory: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Days of backups to keep. Zero and negative values both mean "forever".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub keep_days: i64,
}

impl RetentionPolicy {
    pub fn new(keep_days: i64) -> Self {
        Self { keep_days }
    }

    /// Policy used for the boot-time run, which never deletes anything
    pub fn disabled() -> Self {
        Self { keep_days: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.keep_days > 0
    }
}

/// Fully resolved and validated settings, immutable for the process lifetime
#[derive(Debug, Clone)]
pub struct Settings {
    pub backup_path: PathBuf,
    pub retention: RetentionPolicy,
    pub healthchecks_url: Option<String>,
    pub ping_timeout: Duration,
    pub timezone: Tz,
    pub backup_at_boot: bool,
    pub pgpass_file: PathBuf,
    pub dump_command: String,
    pub log_directory: Option<PathBuf>,
    pub log_level: String,
    pub log_max_files: u32,
}

// Default value functions

fn default_backup_path() -> PathBuf { PathBuf::from("/backups") }
fn default_keep_days() -> i64 { 7 }
fn default_dump_command() -> String { "pg_dumpall".to_string() }
fn default_ping_timeout() -> u64 { 20 }
fn default_timezone() -> String { "UTC".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
