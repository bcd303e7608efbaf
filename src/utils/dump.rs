//! Database dump production
//!
//! A [`DumpProducer`] writes one compressed dump to a target path. The real
//! implementation streams `pg_dumpall` output through a gzip encoder; the
//! exit status is reported but is not the success signal. The verifier
//! decides that from the artifact itself.

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use super::pgpass;

/// What the producer observed while writing the artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    /// Uncompressed bytes read from the producer
    pub raw_bytes: u64,
    /// Exit code of the producer process, `None` if killed by a signal
    pub exit_code: Option<i32>,
}

impl DumpReport {
    pub fn exited_cleanly(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Abstraction over the dump-and-compress pipeline, enabling mocking in tests
pub trait DumpProducer: Send + Sync {
    /// Write a gzip-compressed dump to `target`
    fn produce(&self, target: &Path) -> Result<DumpReport>;
}

/// `pg_dumpall -c -h <host>` piped through gzip
#[derive(Debug, Clone)]
pub struct PgDumpall {
    program: String,
    pgpass_file: PathBuf,
}

impl PgDumpall {
    pub fn new(program: impl Into<String>, pgpass_file: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            pgpass_file: pgpass_file.into(),
        }
    }
}

impl DumpProducer for PgDumpall {
    fn produce(&self, target: &Path) -> Result<DumpReport> {
        let host = pgpass::read_host(&self.pgpass_file)?;
        let args = ["-c", "-h", host.as_str()];

        info!(
            "Backup started: {} {} | gzip > {}",
            self.program,
            args.join(" "),
            target.display()
        );

        let file = File::create(target)
            .with_context(|| format!("Failed to create backup file: {:?}", target))?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

        let spawned = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                // Same outcome as a shell pipeline: an empty but valid stream
                compress_into(&mut io::empty(), encoder, target)?;
                return Err(e).with_context(|| format!("Failed to execute {}", self.program));
            }
        };

        let mut stdout = child
            .stdout
            .take()
            .context("Failed to capture dump output")?;
        let copied = compress_into(&mut stdout, encoder, target);
        // Closing our end first keeps a stalled producer from blocking wait()
        drop(stdout);

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for {}", self.program))?;
        let raw_bytes = copied?;

        let report = DumpReport {
            raw_bytes,
            exit_code: status.code(),
        };

        if report.exited_cleanly() {
            debug!("{} exited cleanly after {} bytes", self.program, raw_bytes);
        } else {
            warn!(
                "{} exited with status {:?} after {} bytes",
                self.program, report.exit_code, raw_bytes
            );
        }

        Ok(report)
    }
}

/// Stream `source` through `encoder` into `target`, returning the raw byte count
///
/// A read or write error removes `target`. Dropping the encoder would
/// otherwise write a valid trailer after a partial dump.
fn compress_into<R: Read>(
    source: &mut R,
    mut encoder: GzEncoder<BufWriter<File>>,
    target: &Path,
) -> Result<u64> {
    match io::copy(source, &mut encoder) {
        Ok(raw_bytes) => {
            finish(encoder)?;
            Ok(raw_bytes)
        }
        Err(e) => {
            drop(encoder);
            match fs::remove_file(target) {
                Ok(()) => warn!("Dropped partial backup {}", target.display()),
                Err(rm) => warn!("Failed to delete partial backup {}: {}", target.display(), rm),
            }
            Err(e).context("Failed to compress dump output")
        }
    }
}

/// Write the gzip trailer and get the data onto disk
fn finish(encoder: GzEncoder<BufWriter<File>>) -> Result<()> {
    let mut writer = encoder.finish().context("Failed to finish gzip stream")?;
    writer.flush().context("Failed to flush backup file")?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all().context("Failed to sync backup file")?;
    Ok(())
}

/// A mock producer for testing that records calls and writes configured artifacts
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// What the mock leaves at the target path
    #[derive(Clone, Debug)]
    pub enum MockDump {
        /// A valid gzip stream holding these bytes
        Payload(Vec<u8>),
        /// A valid gzip stream with no payload (failed producer behind gzip)
        EmptyStream,
        /// A zero-length file
        ZeroBytes,
        /// A gzip stream cut off halfway
        Truncated(Vec<u8>),
        /// Nothing at all, and an error
        Missing,
    }

    impl Default for MockDump {
        fn default() -> Self {
            MockDump::Payload(b"-- PostgreSQL database cluster dump\n".to_vec())
        }
    }

    /// Mock producer for testing
    #[derive(Clone, Default)]
    pub struct MockDumper {
        /// Recorded target paths
        pub calls: Arc<Mutex<Vec<PathBuf>>>,
        /// Responses consumed in order; the default applies once exhausted
        queued: Arc<Mutex<VecDeque<MockDump>>>,
        default_response: Arc<Mutex<MockDump>>,
    }

    impl MockDumper {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for the next call
        pub fn then(self, response: MockDump) -> Self {
            self.queued.lock().unwrap().push_back(response);
            self
        }

        /// Set the response used when the queue is empty
        pub fn with_default_response(self, response: MockDump) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        pub fn get_calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn next_response(&self) -> MockDump {
            self.queued
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }
    }

    /// Gzip `payload` into a byte vector
    pub fn gzip_bytes(payload: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap()
    }

    impl DumpProducer for MockDumper {
        fn produce(&self, target: &Path) -> Result<DumpReport> {
            self.calls.lock().unwrap().push(target.to_path_buf());

            match self.next_response() {
                MockDump::Payload(payload) => {
                    std::fs::write(target, gzip_bytes(&payload))?;
                    Ok(DumpReport {
                        raw_bytes: payload.len() as u64,
                        exit_code: Some(0),
                    })
                }
                MockDump::EmptyStream => {
                    std::fs::write(target, gzip_bytes(&[]))?;
                    Ok(DumpReport {
                        raw_bytes: 0,
                        exit_code: Some(1),
                    })
                }
                MockDump::ZeroBytes => {
                    std::fs::write(target, b"")?;
                    Ok(DumpReport {
                        raw_bytes: 0,
                        exit_code: Some(0),
                    })
                }
                MockDump::Truncated(payload) => {
                    let bytes = gzip_bytes(&payload);
                    std::fs::write(target, &bytes[..bytes.len() / 2])?;
                    Ok(DumpReport {
                        raw_bytes: payload.len() as u64,
                        exit_code: Some(0),
                    })
                }
                MockDump::Missing => anyhow::bail!("Failed to execute pg_dumpall"),
            }
        }
    }
}
