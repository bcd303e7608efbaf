//! pg-backup library
//!
//! Scheduled `pg_dumpall` backups: dump, verify, prune, and report to a
//! healthcheck endpoint.

pub mod config;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{apply_overrides, load_config, resolve_settings, Config, Overrides, Settings};
pub use managers::backup::{BackupJob, JobOutcome};
pub use managers::logging::{init_logging, LogGuard, LoggingConfig};
pub use managers::notification::{NotificationManager, Notifier};
pub use managers::scheduler::{Clock, Scheduler, StartupError, SystemClock};
