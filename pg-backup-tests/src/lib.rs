//! Test utilities for pg-backup
//!
//! This crate provides shared test utilities, mock re-exports,
//! and helper functions for testing the pg-backup scheduler.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext, MockDumper};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::new();
//!     let settings = ConfigBuilder::new(ctx.backup_dir()).keep_days(3).settings();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use pg_backup::config::{Config, RetentionPolicy, Settings};
pub use pg_backup::managers::backup::{BackupJob, JobOutcome};
pub use pg_backup::managers::notification::{Notifier, PingKind};
pub use pg_backup::managers::scheduler::{RunSummary, Scheduler, StartupError};
pub use pg_backup::utils::verify::{ArtifactStats, VerificationFailure};

// Re-export mock implementations from the main crate
pub use pg_backup::managers::notification::mock::RecordingNotifier;
pub use pg_backup::managers::scheduler::mock::ManualClock;
pub use pg_backup::utils::dump::mock::{MockDump, MockDumper};
pub use pg_backup::utils::dump::DumpProducer;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
