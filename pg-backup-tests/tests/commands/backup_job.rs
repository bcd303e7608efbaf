//! Tests for a single backup cycle

use chrono::{TimeZone, Utc};
use test_utils::{
    BackupJob, JobOutcome, MockDump, MockDumper, PingKind, RecordingNotifier, RetentionPolicy,
    TestContext, VerificationFailure,
};

#[test]
fn test_artifact_named_after_local_time() {
    let ctx = TestContext::new();
    let dumper = MockDumper::new();
    let notifier = RecordingNotifier::new();
    let job = BackupJob::new(&dumper, &notifier, chrono_tz::America::New_York);

    let now = Utc.with_ymd_and_hms(2024, 7, 4, 2, 0, 0).unwrap();
    let outcome = job.run_at(now, ctx.backup_dir(), RetentionPolicy::disabled());

    assert!(outcome.is_success());
    // 22:00 EDT on the previous day
    assert_eq!(ctx.artifacts(), vec!["20240703_220000.sql.gz"]);
}

#[test]
fn test_every_failure_kind_leaves_no_artifact() {
    let cases = [
        MockDump::Missing,
        MockDump::ZeroBytes,
        MockDump::EmptyStream,
        MockDump::Truncated((0..8192u32).map(|i| (i * 31 % 253) as u8).collect()),
    ];

    for case in cases {
        let ctx = TestContext::new();
        let dumper = MockDumper::new().then(case.clone());
        let notifier = RecordingNotifier::new();
        let job = BackupJob::new(&dumper, &notifier, chrono_tz::UTC);

        let outcome = job.run(ctx.backup_dir(), RetentionPolicy::new(7));

        assert!(!outcome.is_success(), "{:?} should fail", case);
        assert!(ctx.artifacts().is_empty(), "{:?} left an artifact", case);
        assert_eq!(
            notifier.get_pings(),
            vec![PingKind::Start, PingKind::Failure],
            "{:?} pinged wrongly",
            case
        );
    }
}

#[test]
fn test_success_reports_sizes() {
    let ctx = TestContext::new();
    let payload = test_utils::SAMPLE_DUMP.as_bytes().to_vec();
    let dumper = MockDumper::new().then(MockDump::Payload(payload.clone()));
    let notifier = RecordingNotifier::new();
    let job = BackupJob::new(&dumper, &notifier, chrono_tz::UTC);

    match job.run(ctx.backup_dir(), RetentionPolicy::new(7)) {
        JobOutcome::Succeeded(stats) => {
            assert_eq!(stats.decompressed_size, payload.len() as u64);
            assert!(stats.compressed_size > 0);
            assert!(stats.path.starts_with(ctx.backup_dir()));
        }
        JobOutcome::Failed(failure) => panic!("unexpected failure: {}", failure),
    }
}

#[test]
fn test_pruning_follows_successful_dump() {
    let ctx = TestContext::new();
    let expired = ctx.write_aged_artifact("20240101_000000.sql.gz", 20);
    let current = ctx.write_aged_artifact("20240110_000000.sql.gz", 5);

    let dumper = MockDumper::new();
    let notifier = RecordingNotifier::new();
    let job = BackupJob::new(&dumper, &notifier, chrono_tz::UTC);

    assert!(job.run(ctx.backup_dir(), RetentionPolicy::new(10)).is_success());
    assert!(!expired.exists());
    assert!(current.exists());
    assert_eq!(ctx.artifacts().len(), 2);
}

#[test]
fn test_not_found_when_producer_fails() {
    let ctx = TestContext::new();
    let dumper = MockDumper::new().then(MockDump::Missing);
    let notifier = RecordingNotifier::new();
    let job = BackupJob::new(&dumper, &notifier, chrono_tz::UTC);

    let outcome = job.run(ctx.backup_dir(), RetentionPolicy::disabled());
    assert!(matches!(
        outcome,
        JobOutcome::Failed(VerificationFailure::NotFound(_))
    ));
}
