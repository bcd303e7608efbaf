use super::types::*;
use chrono_tz::Tz;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Unknown timezone '{0}': {1}")]
    InvalidTimezone(String, String),

    #[error("Invalid healthchecks URL '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

/// Apply command-line overrides on top of file/default values
pub fn apply_overrides(mut config: Config, overrides: &Overrides) -> Config {
    if let Some(ref path) = overrides.backup_path {
        config.backup.path = path.clone();
    }
    if let Some(keep_days) = overrides.keep_days {
        config.backup.keep_days = keep_days;
    }
    if let Some(ref url) = overrides.healthchecks_url {
        config.notifications.healthchecks_url = Some(url.clone());
    }
    if overrides.backup_at_boot {
        config.schedule.backup_at_boot = true;
    }
    if let Some(ref tz) = overrides.timezone {
        config.schedule.timezone = tz.clone();
    }
    if let Some(ref pgpass) = overrides.pgpass_file {
        config.backup.pgpass_file = Some(pgpass.clone());
    }
    if let Some(ref cmd) = overrides.dump_command {
        config.backup.dump_command = cmd.clone();
    }
    if let Some(ref dir) = overrides.log_directory {
        config.logging.log_directory = Some(dir.clone());
    }
    if let Some(ref level) = overrides.log_level {
        config.logging.log_level = level.clone();
    }
    config
}

/// Validate the configuration and turn it into immutable settings
pub fn resolve_settings(config: &Config) -> Result<Settings> {
    let timezone = parse_timezone(&config.schedule.timezone)?;
    let healthchecks_url = normalize_url(config.notifications.healthchecks_url.as_deref())?;

    if config.notifications.timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "notifications.timeout_seconds must be greater than zero".to_string(),
        ));
    }

    if config.backup.dump_command.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "backup.dump_command must not be empty".to_string(),
        ));
    }

    let pgpass_file = match config.backup.pgpass_file {
        Some(ref path) => super::expand_tilde(path),
        None => super::default_pgpass_file(),
    };

    Ok(Settings {
        backup_path: super::expand_tilde(&config.backup.path),
        retention: RetentionPolicy::new(config.backup.keep_days),
        healthchecks_url,
        ping_timeout: Duration::from_secs(config.notifications.timeout_seconds),
        timezone,
        backup_at_boot: config.schedule.backup_at_boot,
        pgpass_file,
        dump_command: config.backup.dump_command.clone(),
        log_directory: config
            .logging
            .log_directory
            .as_deref()
            .map(super::expand_tilde),
        log_level: config.logging.log_level.clone(),
        log_max_files: config.logging.log_max_files,
    })
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| ConfigError::InvalidTimezone(name.to_string(), e.to_string()))
}

/// Empty means "no endpoint"; a trailing slash is dropped so `/start` and
/// `/fail` can be appended
fn normalize_url(url: Option<&str>) -> Result<Option<String>> {
    let url = match url.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(u) => u.trim_end_matches('/'),
    };

    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(url.to_string(), e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(
            url.to_string(),
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }

    Ok(Some(url.to_string()))
}
