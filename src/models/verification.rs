use std::path::PathBuf;

use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JSON body accepted by POST /verify and POST /download.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyRequest {
    /// Host the archive was uploaded from.
    #[garde(length(min = 1, max = 200))]
    pub host: String,

    /// Name of the archive to verify.
    #[garde(length(min = 1, max = 200))]
    pub archive: String,

    /// The unique description used when the archive was uploaded.
    #[garde(length(min = 1, max = 200))]
    pub description: String,

    /// Explicit source path, overriding the templated one.
    #[garde(skip)]
    pub path: Option<String>,
}

/// Which endpoint a request came in through. Download keeps the
/// retrieved tree on disk after a successful verification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestedAction {
    Verify,
    Download,
}

impl RequestedAction {
    pub fn retains_download(self) -> bool {
        matches!(self, RequestedAction::Download)
    }
}

/// Caller-visible semantic state of a job.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SemanticState {
    Pending,
    Started,
    Done,
    Error,
}

/// Response after submitting a job.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: String,
    pub job_id: Uuid,
    /// Pollable status link for this job.
    pub link: String,
    /// Effective source path the archive will be retrieved from.
    pub path: PathBuf,
    pub action: RequestedAction,
}

/// Point-in-time job status returned by GET /status/{job_id}.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: SemanticState,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}
