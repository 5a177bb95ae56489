use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue-level state of a verification job.
///
/// Transitions are monotonic: `Pending → Started → {Finished, Failed}`.
/// `Failed` is reserved for worker faults (crash or timeout); a workflow
/// that ran to completion always lands in `Finished`, even when the
/// verification itself reported an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    Pending,
    Started,
    Finished,
    Failed,
}

/// Terminal outcome reported by the verification workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Done,
    Error,
}

/// Structured result produced exactly once at the end of a workflow run.
///
/// `path` points at the artifact most useful for inspection: the
/// comparison log on a verification outcome, the download destination on
/// a retrieval failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationResult {
    pub outcome: Outcome,
    pub msg: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

/// A verification job as held by the queue collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    /// Name of the archive to retrieve and verify.
    pub archive: String,
    /// Where the archive lives on the long-term store.
    pub source_path: PathBuf,
    /// The unique description used when the archive was uploaded.
    pub description: String,
    /// Keep the downloaded tree after a successful verification.
    pub retain: bool,
    pub state: QueueState,
    pub result: Option<VerificationResult>,
    /// Worker fault detail (crash or timeout), set only with `Failed`.
    pub fault: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(archive: &str, source_path: &Path, description: &str, retain: bool) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            archive: archive.to_string(),
            source_path: source_path.to_path_buf(),
            description: description.to_string(),
            retain,
            state: QueueState::Pending,
            result: None,
            fault: None,
            created_at: Utc::now(),
        }
    }
}
