use anyhow::{Context, Result};
use clap::Parser;
use pg_backup::config::{self, Overrides, Settings};
use pg_backup::managers::logging::{self, LoggingConfig};
use pg_backup::managers::notification::NotificationManager;
use pg_backup::managers::scheduler::{Scheduler, SystemClock};
use pg_backup::utils::PgDumpall;
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pg-backup")]
#[command(about = "Simple PostgreSQL backup scheduler for Docker", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory to write backups to [default: /backups]
    #[arg(short = 'p', long)]
    backup_path: Option<PathBuf>,

    /// Days of backups to keep; 0 or less keeps them forever [default: 7]
    #[arg(short = 'k', long, allow_negative_numbers = true)]
    keep_days: Option<i64>,

    /// Healthchecks ping URL (pinged at /start, on success, and at /fail)
    #[arg(long)]
    healthchecks_url: Option<String>,

    /// Run one backup immediately at startup, without pruning
    #[arg(long)]
    backup_at_boot: bool,

    /// Timezone the daily schedule and backup names use [default: UTC]
    #[arg(long)]
    timezone: Option<String>,

    /// Optional TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// PostgreSQL password file to read the database host from [default: ~/.pgpass]
    #[arg(long)]
    pgpass_file: Option<PathBuf>,

    /// Dump program to run [default: pg_dumpall]
    #[arg(long)]
    dump_command: Option<String>,

    /// Also write rotated log files to this directory
    #[arg(long)]
    log_directory: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            backup_path: self.backup_path.clone(),
            keep_days: self.keep_days,
            healthchecks_url: self.healthchecks_url.clone(),
            backup_at_boot: self.backup_at_boot,
            timezone: self.timezone.clone(),
            pgpass_file: self.pgpass_file.clone(),
            dump_command: self.dump_command.clone(),
            log_directory: self.log_directory.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = match cli.config {
        Some(ref path) => config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => config::Config::default(),
    };
    let settings = config::resolve_settings(&config::apply_overrides(file_config, &cli.overrides()))?;

    // Setup logging (must keep guard alive)
    let logging_config = LoggingConfig::from_config(
        settings.log_directory.as_deref(),
        &settings.log_level,
        settings.log_max_files,
    );
    let log_guard = logging::init_logging(&logging_config)?;

    let notifier = NotificationManager::new(settings.healthchecks_url.clone(), settings.ping_timeout)
        .context("Failed to set up healthcheck pings")?;
    let dumper = PgDumpall::new(settings.dump_command.clone(), settings.pgpass_file.clone());
    let scheduler = Scheduler::new(&settings, &dumper, &notifier);

    if scheduler.check_store_root().is_err() {
        drop(log_guard);
        std::process::exit(1);
    }

    log_settings(&settings);

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    spawn_signal_listener(shutdown_tx)?;

    scheduler.run(&SystemClock::new(shutdown_rx));

    drop(log_guard);
    Ok(())
}

fn log_settings(settings: &Settings) {
    info!("Backup scheduler starting");
    info!("  backup destination: {}", settings.backup_path.display());
    info!("  timezone: {}", settings.timezone);
    if settings.retention.is_enabled() {
        info!("  retain {} days of backups", settings.retention.keep_days);
    } else {
        info!("  keep old backups forever");
    }
    match settings.healthchecks_url {
        Some(ref url) => info!("  healthchecks ping URL: {}", url),
        None => info!("  no healthchecks ping URL specified"),
    }
}

/// Watch for SIGINT/SIGTERM on a helper thread. The first signal stops the
/// scheduler at its next wait; a second one exits immediately.
fn spawn_signal_listener(shutdown: mpsc::Sender<()>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create signal runtime")?;

    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            runtime.block_on(async {
                wait_for_signal().await;
                info!("Termination signal received; stopping once the current backup is done");
                let _ = shutdown.send(());

                wait_for_signal().await;
                warn!("Second termination signal received; exiting now");
                std::process::exit(1);
            })
        })
        .context("Failed to spawn signal thread")?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
