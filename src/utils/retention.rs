//! Age-based pruning of old backup artifacts
//!
//! The backup directory is flat and has no manifest, so a directory listing
//! plus each file's modification time is all retention works from.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// A file that could not be removed. Never fatal to the job.
#[derive(Debug, thiserror::Error)]
#[error("Failed to remove {path:?}: {source}")]
pub struct PruneError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Default)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PruneError>,
}

/// Delete files directly under `store_root` older than `keep_days` days
pub fn prune(store_root: &Path, keep_days: i64) -> PruneReport {
    prune_at(store_root, keep_days, SystemTime::now())
}

/// Same as [`prune`], measuring file ages against `now`
///
/// A file exactly `keep_days` days old is kept. `keep_days <= 0` keeps
/// everything.
pub fn prune_at(store_root: &Path, keep_days: i64, now: SystemTime) -> PruneReport {
    let mut report = PruneReport::default();

    if keep_days <= 0 {
        debug!("Retention disabled, keeping all backups");
        return report;
    }

    let max_age = Duration::from_secs((keep_days as u64).saturating_mul(SECONDS_PER_DAY));

    let entries = match fs::read_dir(store_root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list backup directory {:?}: {}", store_root, e);
            return report;
        }
    };

    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();

        // symlink_metadata: links are not followed out of the backup directory
        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        if !metadata.is_file() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping {:?}, no modification time: {}", path, e);
                continue;
            }
        };

        // Timestamps in the future count as brand new
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed old backup: {:?}", path);
                report.removed.push(path);
            }
            Err(source) => {
                let err = PruneError { path, source };
                warn!("{}", err);
                report.failed.push(err);
            }
        }
    }

    info!(
        "Pruned {} old backup(s), {} failure(s)",
        report.removed.len(),
        report.failed.len()
    );

    report
}
