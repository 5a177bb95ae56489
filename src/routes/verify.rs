use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::Outcome;
use crate::models::verification::{
    RequestedAction, SemanticState, StatusResponse, SubmitResponse, VerifyRequest,
};
use crate::services::status::{self, StatusProjection};
use crate::services::submit;

type SubmitReply = Result<Json<SubmitResponse>, (StatusCode, Json<StatusResponse>)>;

/// POST /verify — enqueue a verification job; the downloaded tree is
/// removed after a successful verification.
pub async fn submit_verify(State(state): State<AppState>, Json(body): Json<VerifyRequest>) -> SubmitReply {
    submit_job(state, body, RequestedAction::Verify).await
}

/// POST /download — like /verify, but the retrieved tree is kept on disk.
pub async fn submit_download(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> SubmitReply {
    submit_job(state, body, RequestedAction::Download).await
}

async fn submit_job(state: AppState, body: VerifyRequest, action: RequestedAction) -> SubmitReply {
    if let Err(report) = body.validate() {
        return Err(error_reply(
            StatusCode::BAD_REQUEST,
            format!("invalid request: {report}"),
        ));
    }

    match submit::submit(state.store.as_ref(), &state.config, &body, action).await {
        Ok(receipt) => Ok(Json(SubmitResponse {
            status: "pending".to_string(),
            job_id: receipt.job_id,
            link: receipt.link,
            path: receipt.path,
            action,
        })),
        Err(e) => {
            tracing::error!(error = %e, archive = %body.archive, "failed to enqueue job");
            Err(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to enqueue job".to_string(),
            ))
        }
    }
}

/// GET /status/{job_id} — point-in-time status of a previously enqueued
/// job. Terminal states are consumed: a second poll gets 400.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> (StatusCode, Json<StatusResponse>) {
    // A malformed id and an unknown one are indistinguishable to the caller.
    let projection = match Uuid::parse_str(&job_id) {
        Ok(id) => status::project(state.store.as_ref(), id).await,
        Err(_) => Ok(StatusProjection::Unknown),
    };

    match projection {
        Ok(StatusProjection::Unknown) => error_reply(
            StatusCode::BAD_REQUEST,
            format!("no such job {job_id} found"),
        ),
        Ok(StatusProjection::InFlight { state, msg }) => (
            StatusCode::OK,
            Json(StatusResponse {
                state,
                msg,
                debug: None,
            }),
        ),
        Ok(StatusProjection::Terminal {
            outcome: Outcome::Done,
            msg,
            ..
        }) => (
            StatusCode::OK,
            Json(StatusResponse {
                state: SemanticState::Done,
                msg,
                debug: None,
            }),
        ),
        Ok(StatusProjection::Terminal {
            outcome: Outcome::Error,
            msg,
            debug,
        }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StatusResponse {
                state: SemanticState::Error,
                msg,
                debug,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, job_id = %job_id, "status lookup failed");
            error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "status lookup failed".to_string(),
            )
        }
    }
}

fn error_reply(code: StatusCode, msg: String) -> (StatusCode, Json<StatusResponse>) {
    (
        code,
        Json(StatusResponse {
            state: SemanticState::Error,
            msg,
            debug: None,
        }),
    )
}
