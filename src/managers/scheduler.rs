//! Daily backup scheduler
//!
//! Fires every 24 hours, counted from the moment the schedule starts. The
//! configured timezone only affects how fire times are shown and how
//! artifacts are named. The clock is injected so the policy can be driven
//! without waiting in tests.

use crate::config::{RetentionPolicy, Settings};
use crate::managers::backup::BackupJob;
use crate::managers::notification::Notifier;
use crate::utils::dump::DumpProducer;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{0:?} not found!")]
    StorePathMissing(PathBuf),
}

/// Why a wait returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Elapsed,
    Shutdown,
}

/// Time source for the scheduler
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Block until `deadline`, or until shutdown is requested
    fn wait_until(&self, deadline: DateTime<Utc>) -> Wait;
}

/// Wall clock that wakes early when a message arrives on the shutdown channel
pub struct SystemClock {
    shutdown: Receiver<()>,
}

impl SystemClock {
    pub fn new(shutdown: Receiver<()>) -> Self {
        Self { shutdown }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn wait_until(&self, deadline: DateTime<Utc>) -> Wait {
        loop {
            // Re-read the wall clock after every wakeup; sleeps can overshoot or be cut short
            let remaining = match (deadline - Utc::now()).to_std() {
                Ok(d) if !d.is_zero() => d,
                _ => return Wait::Elapsed,
            };

            match self.shutdown.recv_timeout(remaining) {
                Ok(()) => return Wait::Shutdown,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => std::thread::sleep(remaining),
            }
        }
    }
}

/// Fire times of a fixed 24-hour interval
#[derive(Debug, Clone)]
pub struct DailySchedule {
    next_fire: DateTime<Utc>,
}

fn interval() -> Duration {
    Duration::days(1)
}

impl DailySchedule {
    /// First fire is 24 hours after `start`
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            next_fire: start + interval(),
        }
    }

    /// Next fire time strictly after `now`; fires already in the past are skipped
    pub fn next_after(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut fire = self.next_fire;
        while fire <= now {
            fire += interval();
        }
        self.next_fire = fire + interval();
        fire
    }
}

/// Counts for one scheduler lifetime
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub runs: usize,
    pub failures: usize,
}

pub struct Scheduler<'a> {
    store_root: PathBuf,
    retention: RetentionPolicy,
    backup_at_boot: bool,
    notifier: &'a dyn Notifier,
    job: BackupJob<'a>,
    timezone: Tz,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        settings: &Settings,
        dumper: &'a dyn DumpProducer,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            store_root: settings.backup_path.clone(),
            retention: settings.retention,
            backup_at_boot: settings.backup_at_boot,
            notifier,
            job: BackupJob::new(dumper, notifier, settings.timezone),
            timezone: settings.timezone,
        }
    }

    /// The backup directory must exist before anything is scheduled
    pub fn check_store_root(&self) -> Result<(), StartupError> {
        if self.store_root.is_dir() {
            return Ok(());
        }

        error!("** {} not found!", self.store_root.display());
        self.notifier.notify_failure();
        Err(StartupError::StorePathMissing(self.store_root.clone()))
    }

    /// Check the backup directory, then run until `clock` reports shutdown
    pub fn start(&self, clock: &dyn Clock) -> Result<RunSummary, StartupError> {
        self.check_store_root()?;
        Ok(self.run(clock))
    }

    /// Optional boot-time backup, then one backup per day
    pub fn run(&self, clock: &dyn Clock) -> RunSummary {
        let mut summary = RunSummary::default();

        if self.backup_at_boot {
            info!("Running backup now because --backup-at-boot was specified");
            // Never delete anything on the boot run
            self.tick(clock, RetentionPolicy::disabled(), &mut summary);
        }

        let mut schedule = DailySchedule::starting_at(clock.now());

        loop {
            let next = schedule.next_after(clock.now());
            info!(
                "Next backup at {}",
                next.with_timezone(&self.timezone).format("%Y-%m-%d %H:%M:%S %Z")
            );

            if clock.wait_until(next) == Wait::Shutdown {
                info!(
                    "Backup scheduler stopping after {} run(s), {} failed",
                    summary.runs, summary.failures
                );
                return summary;
            }

            self.tick(clock, self.retention, &mut summary);
        }
    }

    fn tick(&self, clock: &dyn Clock, retention: RetentionPolicy, summary: &mut RunSummary) {
        let outcome = self.job.run_at(clock.now(), &self.store_root, retention);
        summary.runs += 1;
        if !outcome.is_success() {
            summary.failures += 1;
            warn!("Backup failed; waiting for the next scheduled run");
        }
    }
}

/// A manually advanced clock for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
        ticks_left: Mutex<usize>,
        waits: Mutex<Vec<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Starts at `start` and lets `ticks` waits elapse before reporting shutdown
        pub fn new(start: DateTime<Utc>, ticks: usize) -> Self {
            Self {
                now: Mutex::new(start),
                ticks_left: Mutex::new(ticks),
                waits: Mutex::new(Vec::new()),
            }
        }

        /// Every deadline the scheduler waited for, including the final one
        pub fn get_waits(&self) -> Vec<DateTime<Utc>> {
            self.waits.lock().unwrap().clone()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        fn wait_until(&self, deadline: DateTime<Utc>) -> Wait {
            self.waits.lock().unwrap().push(deadline);

            let mut ticks_left = self.ticks_left.lock().unwrap();
            if *ticks_left == 0 {
                return Wait::Shutdown;
            }
            *ticks_left -= 1;

            let mut now = self.now.lock().unwrap();
            if deadline > *now {
                *now = deadline;
            }
            Wait::Elapsed
        }
    }
}
