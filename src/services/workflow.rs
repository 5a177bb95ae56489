//! The verification unit of work executed by a worker.
//!
//! Acquire the archive, verify its checksums against the pre-archival
//! manifest, optionally clean up the download, and report a structured
//! result. All failure paths leave the downloaded tree in place for
//! inspection.

use thiserror::Error;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::models::job::{JobRecord, Outcome, VerificationResult};
use crate::services::archive::{ArchiveClient, Retrieval, RetrievalError};
use crate::services::checksum::{self, ChecksumError};

#[derive(Debug, Error)]
enum WorkflowError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),
}

/// Run the full acquire → verify → cleanup sequence for one job.
///
/// Always yields a result: internal failures fold into an `Error`
/// outcome with the failure detail attached as debug.
pub async fn execute(job: &JobRecord, config: &AppConfig) -> VerificationResult {
    let span = tracing::info_span!("verify_job", job_id = %job.job_id, archive = %job.archive);
    async {
        match run(job, config).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "workflow aborted");
                VerificationResult {
                    outcome: Outcome::Error,
                    msg: "archive verification aborted".to_string(),
                    path: config.verify_root_dir.clone(),
                    debug: Some(e.to_string()),
                }
            }
        }
    }
    .instrument(span)
    .await
}

async fn run(job: &JobRecord, config: &AppConfig) -> Result<VerificationResult, WorkflowError> {
    let client = ArchiveClient::from_config(
        config,
        &job.archive,
        &job.source_path,
        &job.description,
        job.job_id,
    )?;
    let dest = client.destination();

    match client.retrieve().await? {
        Retrieval::Complete => {}
        Retrieval::Failed { debug } => {
            tracing::warn!(path = %dest.display(), "archive retrieval failed");
            return Ok(VerificationResult {
                outcome: Outcome::Error,
                msg: "failed to properly download archive".to_string(),
                path: dest,
                debug,
            });
        }
    }

    let archive_root = client.downloaded_path();
    tracing::debug!(path = %archive_root.display(), "verifying archive checksums");
    let comparison = checksum::compare_manifest(&archive_root).await?;

    if !comparison.matched {
        tracing::warn!(log = %comparison.log_path.display(), "checksum comparison failed");
        return Ok(VerificationResult {
            outcome: Outcome::Error,
            msg: "failed to verify archive md5sums".to_string(),
            path: comparison.log_path,
            debug: None,
        });
    }

    if !job.retain {
        // A failed cleanup never turns a verified archive into an error.
        if let Err(e) = client.cleanup().await {
            tracing::warn!(error = %e, path = %dest.display(), "cleanup after successful verify failed");
        }
    }

    tracing::info!(log = %comparison.log_path.display(), "archive verified");
    Ok(VerificationResult {
        outcome: Outcome::Done,
        msg: "successfully verified archive md5sums".to_string(),
        path: comparison.log_path,
        debug: None,
    })
}
