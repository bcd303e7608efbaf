//! Configuration module for pg-backup
//!
//! Settings come from three layers (later overrides earlier):
//! 1. Built-in defaults
//! 2. An optional TOML file (`--config`)
//! 3. Command-line flags
//!
//! ## Example Usage
//!
//! ```no_run
//! use pg_backup::config;
//!
//! let file = config::load_config("pg-backup.toml")?;
//! let settings = config::resolve_settings(&file)?;
//! println!("Backups go to {:?}", settings.backup_path);
//! # Ok::<(), pg_backup::config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{apply_overrides, load_config, resolve_settings, ConfigError, Result};
pub use types::*;

use std::path::{Path, PathBuf};

/// Expand tilde (~) in path
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// `~/.pgpass`, the file pg_dumpall itself reads credentials from
pub fn default_pgpass_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/root"))
        .join(".pgpass")
}
