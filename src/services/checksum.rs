//! Invokes the checksum tool against the manifest shipped with an archive.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

/// Manifest file generated before archival and shipped inside the archive.
pub const MANIFEST_NAME: &str = "checksums_prior_to_pdc.md5";

/// Comparison log written sibling to the archive directory.
pub const COMPARE_LOG_NAME: &str = "compare_md5sum.out";

#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("archive directory has no parent: {0}")]
    NoParent(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a manifest comparison. The log path is reported on both
/// outcomes so mismatches can be inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumOutcome {
    pub matched: bool,
    pub log_path: PathBuf,
}

/// Recompute checksums under `archive_dir` and compare them against the
/// manifest, writing the tool output to the comparison log. Exit 0 from
/// the tool means every file matched.
pub async fn compare_manifest(archive_dir: &Path) -> Result<ChecksumOutcome, ChecksumError> {
    let parent = archive_dir
        .parent()
        .ok_or_else(|| ChecksumError::NoParent(archive_dir.to_path_buf()))?;
    let log_path = parent.join(COMPARE_LOG_NAME);

    let output = Command::new("md5sum")
        .arg("-c")
        .arg(MANIFEST_NAME)
        .current_dir(archive_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let mut log = Vec::with_capacity(output.stdout.len() + output.stderr.len());
    log.extend_from_slice(&output.stdout);
    log.extend_from_slice(&output.stderr);
    tokio::fs::write(&log_path, log).await?;

    Ok(ChecksumOutcome {
        matched: output.status.success(),
        log_path,
    })
}
