//! Unit tests for dump artifact verification

use pg_backup::utils::verify::verify;
use test_utils::{
    empty_gzip, gzip, truncated_gzip, ResultAssertions, TestContext, VerificationFailure,
    SAMPLE_DUMP,
};

#[test]
fn test_not_found_does_not_touch_directory() {
    let ctx = TestContext::new();
    let neighbour = ctx.write_artifact("20240101_000000.sql.gz", &gzip(b"keep me"));

    let result = verify(&ctx.backup_dir().join("20240102_000000.sql.gz"));

    assert!(matches!(result, Err(VerificationFailure::NotFound(_))));
    assert!(neighbour.exists());
}

#[test]
fn test_zero_length_file_is_deleted() {
    let ctx = TestContext::new();
    let path = ctx.write_artifact("20240101_000000.sql.gz", b"");

    let failure = verify(&path).unwrap_err();

    assert!(matches!(failure, VerificationFailure::EmptyCompressed(_)));
    assert_eq!(failure.path(), path.as_path());
    assert!(ctx.artifacts().is_empty());
}

#[test]
fn test_empty_stream_is_deleted() {
    let ctx = TestContext::new();
    let path = ctx.write_artifact("20240101_000000.sql.gz", &empty_gzip());

    let result = verify(&path);

    assert!(matches!(result, Err(VerificationFailure::EmptyDecompressed(_))));
    result.assert_err_contains("decompresses to zero bytes");
    assert!(ctx.artifacts().is_empty());
}

#[test]
fn test_truncated_stream_is_deleted() {
    let ctx = TestContext::new();
    let path = ctx.write_artifact("20240101_000000.sql.gz", &truncated_gzip());

    let result = verify(&path);

    assert!(matches!(result, Err(VerificationFailure::Unreadable { .. })));
    assert!(ctx.artifacts().is_empty());
}

#[test]
fn test_valid_dump_reports_both_sizes() {
    let ctx = TestContext::new();
    let bytes = gzip(SAMPLE_DUMP.as_bytes());
    let path = ctx.write_artifact("20240101_000000.sql.gz", &bytes);

    let stats = verify(&path).assert_ok();

    assert_eq!(stats.compressed_size, bytes.len() as u64);
    assert_eq!(stats.decompressed_size, SAMPLE_DUMP.len() as u64);
    assert_eq!(ctx.artifacts(), vec!["20240101_000000.sql.gz"]);
}

#[test]
fn test_failure_messages_name_the_file() {
    let ctx = TestContext::new();
    let path = ctx.write_artifact("20240101_000000.sql.gz", b"");

    verify(&path).assert_err_contains("20240101_000000.sql.gz");
}
