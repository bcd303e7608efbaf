//! Dump artifact verification
//!
//! A `pg_dumpall | gzip` pipeline reports success whenever gzip does, even if
//! the dump itself produced nothing: gzip happily compresses zero bytes into
//! a valid, non-empty stream. The artifact's sizes are therefore the real
//! success signal. Any artifact failing a check is deleted on the spot.

use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Sizes of an artifact that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStats {
    pub path: PathBuf,
    pub compressed_size: u64,
    pub decompressed_size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationFailure {
    #[error("{0:?} not found")]
    NotFound(PathBuf),

    #[error("{0:?} is empty")]
    EmptyCompressed(PathBuf),

    #[error("{0:?} decompresses to zero bytes")]
    EmptyDecompressed(PathBuf),

    #[error("{path:?} is not a readable gzip stream: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl VerificationFailure {
    pub fn path(&self) -> &Path {
        match self {
            VerificationFailure::NotFound(p)
            | VerificationFailure::EmptyCompressed(p)
            | VerificationFailure::EmptyDecompressed(p) => p,
            VerificationFailure::Unreadable { path, .. } => path,
        }
    }
}

/// Check that `path` holds a non-empty gzip stream with a non-empty payload
pub fn verify(path: &Path) -> Result<ArtifactStats, VerificationFailure> {
    let metadata = match fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        _ => {
            error!("** Backup failed! {} not found.", path.display());
            return Err(VerificationFailure::NotFound(path.to_path_buf()));
        }
    };

    let compressed_size = metadata.len();
    if compressed_size == 0 {
        error!("** Backup failed! {} is empty; deleting.", path.display());
        discard(path);
        return Err(VerificationFailure::EmptyCompressed(path.to_path_buf()));
    }

    let decompressed_size = match decompressed_len(path) {
        Ok(size) => size,
        Err(source) => {
            error!(
                "** Backup failed! {} could not be decompressed ({}); deleting.",
                path.display(),
                source
            );
            discard(path);
            return Err(VerificationFailure::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if decompressed_size == 0 {
        error!("** Backup failed! Uncompressed backup size is 0; deleting.");
        discard(path);
        return Err(VerificationFailure::EmptyDecompressed(path.to_path_buf()));
    }

    Ok(ArtifactStats {
        path: path.to_path_buf(),
        compressed_size,
        decompressed_size,
    })
}

/// Count decompressed bytes without keeping them anywhere
pub fn decompressed_len(path: &Path) -> io::Result<u64> {
    let file = File::open(path)?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(file));
    io::copy(&mut decoder, &mut io::sink())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to delete failed backup {}: {}", path.display(), e);
    }
}
