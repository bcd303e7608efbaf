//! Fluent API for building test configurations
//!
//! Starts from the built-in defaults and resolves into [`Settings`] the same
//! way the binary does.

use pg_backup::config::{resolve_settings, Config, Settings};
use std::path::{Path, PathBuf};

/// Builder for creating test configurations
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Defaults, with backups going to `backup_path`
    pub fn new(backup_path: &Path) -> Self {
        let mut config = Config::default();
        config.backup.path = backup_path.to_path_buf();
        Self { config }
    }

    pub fn keep_days(mut self, days: i64) -> Self {
        self.config.backup.keep_days = days;
        self
    }

    pub fn backup_at_boot(mut self) -> Self {
        self.config.schedule.backup_at_boot = true;
        self
    }

    pub fn timezone(mut self, name: &str) -> Self {
        self.config.schedule.timezone = name.to_string();
        self
    }

    pub fn healthchecks_url(mut self, url: &str) -> Self {
        self.config.notifications.healthchecks_url = Some(url.to_string());
        self
    }

    pub fn pgpass_file(mut self, path: PathBuf) -> Self {
        self.config.backup.pgpass_file = Some(path);
        self
    }

    pub fn dump_command(mut self, program: &str) -> Self {
        self.config.backup.dump_command = program.to_string();
        self
    }

    /// Get the raw configuration
    pub fn build(self) -> Config {
        self.config
    }

    /// Serialize to TOML, as a user would write it
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(&self.config).expect("Failed to serialize config")
    }

    /// Resolve into validated settings, panicking on invalid input
    pub fn settings(&self) -> Settings {
        resolve_settings(&self.config).expect("Test configuration should be valid")
    }
}
