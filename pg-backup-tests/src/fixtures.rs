//! Test fixtures and sample data
//!
//! Provides pre-built artifacts, password files and config templates.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

/// Start of a realistic `pg_dumpall -c` output
pub const SAMPLE_DUMP: &str = "--
-- PostgreSQL database cluster dump
--

SET default_transaction_read_only = off;
SET client_encoding = 'UTF8';
SET standard_conforming_strings = on;

DROP DATABASE IF EXISTS app;
CREATE ROLE app;
ALTER ROLE app WITH NOSUPERUSER INHERIT NOCREATEROLE NOCREATEDB LOGIN;
";

/// A password file entry pointing at `host`
pub fn pgpass_line(host: &str) -> String {
    format!("{}:5432:*:postgres:secret\n", host)
}

/// Gzip `payload` into a single-member stream
pub fn gzip(payload: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).expect("Failed to compress fixture");
    encoder.finish().expect("Failed to finish fixture stream")
}

/// What gzip writes when its input is empty: valid and non-empty, but holds nothing
pub fn empty_gzip() -> Vec<u8> {
    gzip(&[])
}

/// A stream cut off halfway through
pub fn truncated_gzip() -> Vec<u8> {
    let payload: Vec<u8> = (0..8192u32).map(|i| (i * 31 % 253) as u8).collect();
    let bytes = gzip(&payload);
    bytes[..bytes.len() / 2].to_vec()
}

/// Config file exercising every table
pub fn full_config_toml() -> &'static str {
    r#"
[backup]
path = "{backup_path}"
keep_days = 14
pgpass_file = "{pgpass_file}"
dump_command = "pg_dumpall"

[notifications]
healthchecks_url = "https://hc-ping.com/0000-1111/"
timeout_seconds = 10

[schedule]
timezone = "Europe/Berlin"
backup_at_boot = true

[logging]
log_level = "debug"
log_max_files = 3
"#
}

/// Fill the `{placeholder}` slots of a template
pub fn render(template: &str, replacements: &[(&str, &str)]) -> String {
    replacements
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            // TOML strings need forward slashes on Windows
            acc.replace(&format!("{{{}}}", key), &value.replace('\\', "/"))
        })
}
