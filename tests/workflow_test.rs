//! End-to-end workflow runs against pre-staged fixture archives, using
//! the real checksum tool.

mod helpers;

use std::path::Path;

use archive_verify::models::job::{JobRecord, Outcome};
use archive_verify::services::workflow;

fn job(archive: &str, retain: bool) -> JobRecord {
    JobRecord::new(archive, Path::new("/unused/source"), "descr", retain)
}

#[tokio::test]
async fn verified_archive_reports_done_with_comparison_log() {
    let root = tempfile::tempdir().unwrap();
    let dest = helpers::stage_archive(root.path(), "arch_a_1", "arch_a", "hello\n");
    let config = helpers::fixture_config(root.path());

    let result = workflow::execute(&job("arch_a", true), &config).await;

    assert_eq!(result.outcome, Outcome::Done);
    assert!(result.msg.contains("verified"));
    assert!(result.path.starts_with(&dest));
    assert!(result.path.exists());
}

#[tokio::test]
async fn destination_removed_after_verify_when_not_retained() {
    let root = tempfile::tempdir().unwrap();
    let dest = helpers::stage_archive(root.path(), "arch_a_1", "arch_a", "hello\n");
    let config = helpers::fixture_config(root.path());

    let result = workflow::execute(&job("arch_a", false), &config).await;

    assert_eq!(result.outcome, Outcome::Done);
    assert!(!dest.exists());
}

#[tokio::test]
async fn destination_kept_after_verify_when_retained() {
    let root = tempfile::tempdir().unwrap();
    let dest = helpers::stage_archive(root.path(), "arch_a_1", "arch_a", "hello\n");
    let config = helpers::fixture_config(root.path());

    let result = workflow::execute(&job("arch_a", true), &config).await;

    assert_eq!(result.outcome, Outcome::Done);
    assert!(dest.exists());
}

#[tokio::test]
async fn checksum_mismatch_reports_error_and_keeps_the_tree() {
    let root = tempfile::tempdir().unwrap();
    let dest = helpers::stage_archive(root.path(), "arch_a_1", "arch_a", "tampered\n");
    let config = helpers::fixture_config(root.path());

    let result = workflow::execute(&job("arch_a", false), &config).await;

    assert_eq!(result.outcome, Outcome::Error);
    assert!(result.msg.contains("verify archive md5sums"));
    assert!(result.path.exists()); // the comparison log
    assert!(dest.exists()); // failure paths never clean up
}

#[tokio::test]
async fn missing_archive_reports_download_error() {
    let root = tempfile::tempdir().unwrap();
    let config = helpers::fixture_config(root.path());

    let result = workflow::execute(&job("arch_missing", false), &config).await;

    assert_eq!(result.outcome, Outcome::Error);
    assert!(result.msg.contains("failed to properly download archive"));
    assert!(result.debug.unwrap().contains("arch_missing"));
}
