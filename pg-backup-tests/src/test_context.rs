//! Test context and harness
//!
//! Provides a temporary backup directory plus helpers for placing and aging
//! artifacts in it.

use crate::fixtures;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// Backup directory inside the temp dir
    backup_dir: PathBuf,
}

impl TestContext {
    /// Create a new test context with an empty backup directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backup_dir = temp_dir.path().join("backups");
        fs::create_dir_all(&backup_dir).expect("Failed to create backup dir");
        Self {
            temp_dir,
            backup_dir,
        }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the backup directory path
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// A path inside the temp dir that does not exist
    pub fn missing_dir(&self) -> PathBuf {
        self.temp_dir.path().join("does-not-exist")
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Create a password file whose first entry points at `host`
    pub fn create_pgpass(&self, host: &str) -> PathBuf {
        self.create_file(".pgpass", &fixtures::pgpass_line(host))
    }

    /// Write raw bytes as an artifact in the backup directory
    pub fn write_artifact(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.backup_dir.join(name);
        fs::write(&path, bytes).expect("Failed to write artifact");
        path
    }

    /// Write an artifact and set its modification time `days` into the past
    pub fn write_aged_artifact(&self, name: &str, days: u64) -> PathBuf {
        let path = self.write_artifact(name, &fixtures::gzip(fixtures::SAMPLE_DUMP.as_bytes()));
        set_age(&path, Duration::from_secs(days * 86_400));
        path
    }

    /// File names in the backup directory, sorted
    pub fn artifacts(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.backup_dir)
            .expect("Failed to list backup dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.temp_dir.path().join(name))?)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Move a file's modification time `age` into the past
pub fn set_age(path: &Path, age: Duration) {
    let file = fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open file for mtime update");
    file.set_modified(SystemTime::now() - age)
        .expect("Failed to set modification time");
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display> ResultAssertions<T> for std::result::Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
