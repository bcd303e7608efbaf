//! Tests for the daily scheduler

use chrono::{Duration, TimeZone, Utc};
use test_utils::{
    ConfigBuilder, ManualClock, MockDump, MockDumper, PingKind, RecordingNotifier, RunSummary,
    Scheduler, StartupError, TestContext,
};

#[test]
fn test_missing_backup_path_means_no_backups() {
    let ctx = TestContext::new();
    let settings = ConfigBuilder::new(&ctx.missing_dir())
        .backup_at_boot()
        .healthchecks_url("https://hc-ping.com/abc")
        .settings();
    let dumper = MockDumper::new();
    let notifier = RecordingNotifier::new();
    let clock = ManualClock::new(Utc::now(), 3);

    let result = Scheduler::new(&settings, &dumper, &notifier).start(&clock);

    assert!(matches!(result, Err(StartupError::StorePathMissing(_))));
    assert_eq!(notifier.get_pings(), vec![PingKind::Failure]);
    assert_eq!(dumper.call_count(), 0);
}

#[test]
fn test_failure_then_success() {
    let ctx = TestContext::new();
    let settings = ConfigBuilder::new(ctx.backup_dir()).settings();
    let dumper = MockDumper::new().then(MockDump::ZeroBytes);
    let notifier = RecordingNotifier::new();
    let clock = ManualClock::new(Utc::now(), 2);

    let summary = Scheduler::new(&settings, &dumper, &notifier)
        .start(&clock)
        .unwrap();

    assert_eq!(summary, RunSummary { runs: 2, failures: 1 });
    assert_eq!(dumper.call_count(), 2);
    assert_eq!(ctx.artifacts().len(), 1);
    assert_eq!(notifier.count(PingKind::Failure), 1);
    assert_eq!(notifier.count(PingKind::Success), 1);
}

#[test]
fn test_no_boot_run_by_default() {
    let ctx = TestContext::new();
    let settings = ConfigBuilder::new(ctx.backup_dir()).settings();
    let dumper = MockDumper::new();
    let notifier = RecordingNotifier::new();
    let clock = ManualClock::new(Utc::now(), 0);

    let summary = Scheduler::new(&settings, &dumper, &notifier)
        .start(&clock)
        .unwrap();

    assert_eq!(summary.runs, 0);
    assert_eq!(dumper.call_count(), 0);
    assert_eq!(clock.get_waits().len(), 1);
}

#[test]
fn test_boot_run_ignores_retention() {
    let ctx = TestContext::new();
    let old = ctx.write_aged_artifact("20240101_000000.sql.gz", 60);
    let settings = ConfigBuilder::new(ctx.backup_dir())
        .keep_days(10)
        .backup_at_boot()
        .settings();
    let dumper = MockDumper::new();
    let notifier = RecordingNotifier::new();
    let clock = ManualClock::new(Utc::now(), 0);

    let summary = Scheduler::new(&settings, &dumper, &notifier)
        .start(&clock)
        .unwrap();

    assert_eq!(summary.runs, 1);
    assert!(old.exists());
    assert_eq!(ctx.artifacts().len(), 2);
}

#[test]
fn test_boot_run_then_scheduled_run_prunes() {
    let ctx = TestContext::new();
    let old = ctx.write_aged_artifact("20240101_000000.sql.gz", 60);
    let settings = ConfigBuilder::new(ctx.backup_dir())
        .keep_days(10)
        .backup_at_boot()
        .settings();
    let dumper = MockDumper::new();
    let notifier = RecordingNotifier::new();
    let clock = ManualClock::new(Utc::now(), 1);

    let summary = Scheduler::new(&settings, &dumper, &notifier)
        .start(&clock)
        .unwrap();

    assert_eq!(summary.runs, 2);
    assert!(!old.exists());
    // Boot artifact plus the scheduled one, named a day apart
    assert_eq!(ctx.artifacts().len(), 2);
}

#[test]
fn test_dst_change_keeps_24_hour_interval() {
    let ctx = TestContext::new();
    let settings = ConfigBuilder::new(ctx.backup_dir())
        .timezone("America/New_York")
        .settings();
    let dumper = MockDumper::new();
    let notifier = RecordingNotifier::new();

    // 03:00 EST, the day before the 2024 spring-forward
    let start = Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
    let clock = ManualClock::new(start, 2);

    Scheduler::new(&settings, &dumper, &notifier)
        .start(&clock)
        .unwrap();

    let waits = clock.get_waits();
    assert_eq!(waits[0] - start, Duration::hours(24));
    assert_eq!(waits[1] - waits[0], Duration::hours(24));
    // Same instants, named in local time: 04:00 EDT after the switch
    assert_eq!(
        ctx.artifacts(),
        vec!["20240310_040000.sql.gz", "20240311_040000.sql.gz"]
    );
}
