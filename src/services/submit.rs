//! Accepts verification requests and hands them to the queue.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::job::JobRecord;
use crate::models::verification::{RequestedAction, VerifyRequest};
use crate::services::queue::{JobStore, QueueError};

/// Tracking handle returned to the caller at submission time.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub job_id: Uuid,
    pub link: String,
    pub path: PathBuf,
    pub action: RequestedAction,
}

/// Effective archive source path: an explicit path wins, otherwise the
/// configured root template with `{host}` filled in, joined with the
/// archive name.
pub fn source_path(config: &AppConfig, request: &VerifyRequest) -> PathBuf {
    match &request.path {
        Some(path) => PathBuf::from(path),
        None => {
            let root = config.source_root_template.replace("{host}", &request.host);
            Path::new(&root).join(&request.archive)
        }
    }
}

/// Enqueue a verification job and return immediately with a pollable
/// handle; execution happens on a separate worker.
pub async fn submit(
    store: &dyn JobStore,
    config: &AppConfig,
    request: &VerifyRequest,
    action: RequestedAction,
) -> Result<SubmitReceipt, QueueError> {
    let path = source_path(config, request);
    let record = JobRecord::new(
        &request.archive,
        &path,
        &request.description,
        action.retains_download(),
    );
    store.enqueue(&record, &config.queue_policy()).await?;

    metrics::counter!("archive_verify_jobs_submitted").increment(1);
    tracing::info!(
        job_id = %record.job_id,
        archive = %request.archive,
        action = ?action,
        "job enqueued"
    );

    Ok(SubmitReceipt {
        job_id: record.job_id,
        link: format!(
            "{}/status/{}",
            config.base_url.trim_end_matches('/'),
            record.job_id
        ),
        path,
        action,
    })
}
