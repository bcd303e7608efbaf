//! PostgreSQL password file lookup
//!
//! Lines look like `hostname:port:database:username:password`. Only the
//! host of the first entry is needed; pg_dumpall reads the rest of the
//! credentials from the same file on its own.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read the dump target host from the first line of the password file
pub fn read_host(pgpass_file: &Path) -> Result<String> {
    let contents = fs::read_to_string(pgpass_file)
        .with_context(|| format!("Failed to read password file: {:?}", pgpass_file))?;

    parse_host(&contents)
        .with_context(|| format!("No host entry in password file: {:?}", pgpass_file))
}

fn parse_host(contents: &str) -> Option<String> {
    let first_line = contents.lines().next()?.trim();
    let host = first_line.split(':').next()?.trim();
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
