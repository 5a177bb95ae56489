//! Maps queue-level job state onto the caller-visible semantic state.

use uuid::Uuid;

use crate::models::job::{Outcome, QueueState};
use crate::models::verification::SemanticState;
use crate::services::queue::{JobStore, QueueError};

/// Caller-visible projection of a job's state at poll time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusProjection {
    /// No record for the id: never submitted, expired, or already
    /// consumed by an earlier terminal read.
    Unknown,
    /// Queued or executing; poll again later.
    InFlight { state: SemanticState, msg: String },
    /// Terminal. The structured result (or worker fault) has been read
    /// and the job record consumed; a later poll sees `Unknown`.
    Terminal {
        outcome: Outcome,
        msg: String,
        debug: Option<String>,
    },
}

/// Look up a job and project its state. Terminal states are read exactly
/// once: the record is deleted before returning.
pub async fn project(store: &dyn JobStore, job_id: Uuid) -> Result<StatusProjection, QueueError> {
    let Some(record) = store.fetch(job_id).await? else {
        return Ok(StatusProjection::Unknown);
    };

    let projection = match record.state {
        QueueState::Pending => {
            return Ok(StatusProjection::InFlight {
                state: SemanticState::Pending,
                msg: format!("job {job_id} has not started yet"),
            })
        }
        QueueState::Started => {
            return Ok(StatusProjection::InFlight {
                state: SemanticState::Started,
                msg: format!("job {job_id} is currently running"),
            })
        }
        // The caller-visible state comes from the structured result,
        // never from the queue-level terminal flag alone: a job can
        // finish execution and still report a verification error.
        QueueState::Finished => match record.result {
            Some(result) => StatusProjection::Terminal {
                outcome: result.outcome,
                msg: format!(
                    "job {} has returned with result: {} ({})",
                    job_id,
                    result.msg,
                    result.path.display()
                ),
                debug: result.debug,
            },
            None => StatusProjection::Terminal {
                outcome: Outcome::Error,
                msg: format!("job {job_id} finished without a result"),
                debug: record.fault,
            },
        },
        QueueState::Failed => {
            let fault = record
                .fault
                .clone()
                .unwrap_or_else(|| "unknown worker fault".to_string());
            StatusProjection::Terminal {
                outcome: Outcome::Error,
                msg: format!("job {job_id} failed with error: {fault}"),
                debug: record.fault,
            }
        }
    };

    store.delete(job_id).await?;
    Ok(projection)
}
