//! Backup job - one dump, verify, prune, notify cycle

use crate::config::RetentionPolicy;
use crate::managers::notification::Notifier;
use crate::utils::dump::DumpProducer;
use crate::utils::retention;
use crate::utils::verify::{self, ArtifactStats, VerificationFailure};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{error, info};

/// Suffix of every backup artifact
pub const ARTIFACT_SUFFIX: &str = ".sql.gz";

/// How a single cycle ended. Failures are already logged and reported.
#[derive(Debug)]
pub enum JobOutcome {
    Succeeded(ArtifactStats),
    Failed(VerificationFailure),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded(_))
    }
}

/// Artifact path for a backup taken at `now`, named in the local time of `timezone`
pub fn artifact_path(store_root: &Path, now: DateTime<Utc>, timezone: Tz) -> PathBuf {
    let stamp = now.with_timezone(&timezone).format("%Y%m%d_%H%M%S");
    store_root.join(format!("{}{}", stamp, ARTIFACT_SUFFIX))
}

pub struct BackupJob<'a> {
    dumper: &'a dyn DumpProducer,
    notifier: &'a dyn Notifier,
    timezone: Tz,
}

impl<'a> BackupJob<'a> {
    pub fn new(dumper: &'a dyn DumpProducer, notifier: &'a dyn Notifier, timezone: Tz) -> Self {
        Self {
            dumper,
            notifier,
            timezone,
        }
    }

    /// Run one backup cycle now
    pub fn run(&self, store_root: &Path, retention: RetentionPolicy) -> JobOutcome {
        self.run_at(Utc::now(), store_root, retention)
    }

    /// Run one backup cycle, naming the artifact and aging old ones against `now`
    ///
    /// Never fails past this boundary: a bad dump is logged, reported via a
    /// failure ping and returned as [`JobOutcome::Failed`].
    pub fn run_at(
        &self,
        now: DateTime<Utc>,
        store_root: &Path,
        retention: RetentionPolicy,
    ) -> JobOutcome {
        let start_time = Instant::now();
        self.notifier.notify_start();

        let target = artifact_path(store_root, now, self.timezone);

        // The artifact on disk decides success, not the producer's result
        if let Err(e) = self.dumper.produce(&target) {
            error!("Dump producer failed: {:#}", e);
        }

        let stats = match verify::verify(&target) {
            Ok(stats) => stats,
            Err(failure) => {
                self.notifier.notify_failure();
                error!("Backup failed after {:.2}s: {}", start_time.elapsed().as_secs_f64(), failure);
                return JobOutcome::Failed(failure);
            }
        };

        info!(
            "Backup complete. {} size: {}; uncompressed size: {}",
            stats.path.display(),
            stats.compressed_size,
            stats.decompressed_size
        );

        if retention.is_enabled() {
            info!(
                "Pruning old backups - retaining {} days of backups",
                retention.keep_days
            );
            retention::prune_at(store_root, retention.keep_days, SystemTime::from(now));
        }

        self.notifier.notify_success();

        info!("Done in {:.2}s.", start_time.elapsed().as_secs_f64());
        JobOutcome::Succeeded(stats)
    }
}
