//! Route handlers exercised directly, without a live server.

mod helpers;

use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::Json;

use archive_verify::app_state::AppState;
use archive_verify::models::verification::{RequestedAction, SemanticState, VerifyRequest};
use archive_verify::routes::verify::{get_status, submit_download, submit_verify};
use archive_verify::services::queue::{InMemoryJobStore, JobStore};

fn app_state(verify_root: &std::path::Path) -> AppState {
    AppState::new(
        helpers::fixture_config(verify_root),
        Arc::new(InMemoryJobStore::new()),
    )
}

fn request(archive: &str) -> VerifyRequest {
    VerifyRequest {
        host: "testbox".to_string(),
        archive: archive.to_string(),
        description: "test-description".to_string(),
        path: None,
    }
}

#[tokio::test]
async fn status_of_never_submitted_id_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let state = app_state(root.path());

    let (code, Json(body)) =
        get_status(State(state), UrlPath("foobar".to_string())).await;

    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body.state, SemanticState::Error);
    assert!(body.msg.contains("no such job foobar found"));
}

#[tokio::test]
async fn verify_submission_returns_a_pending_handle() {
    let root = tempfile::tempdir().unwrap();
    let state = app_state(root.path());

    let Json(body) = submit_verify(State(state.clone()), Json(request("arch_a")))
        .await
        .expect("submission should succeed");

    assert_eq!(body.status, "pending");
    assert_eq!(body.action, RequestedAction::Verify);
    assert!(body.link.contains(&body.job_id.to_string()));

    let record = state.store.fetch(body.job_id).await.unwrap().unwrap();
    assert!(!record.retain);
}

#[tokio::test]
async fn download_submission_marks_the_job_retained() {
    let root = tempfile::tempdir().unwrap();
    let state = app_state(root.path());

    let Json(body) = submit_download(State(state.clone()), Json(request("arch_a")))
        .await
        .expect("submission should succeed");

    assert_eq!(body.action, RequestedAction::Download);
    let record = state.store.fetch(body.job_id).await.unwrap().unwrap();
    assert!(record.retain);
}

#[tokio::test]
async fn malformed_submission_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let state = app_state(root.path());

    let reply = submit_verify(State(state), Json(request(""))).await;

    let (code, Json(body)) = reply.expect_err("empty archive name must be rejected");
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body.state, SemanticState::Error);
    assert!(body.msg.contains("invalid request"));
}

#[tokio::test]
async fn submitted_job_is_pollable_until_terminal() {
    let root = tempfile::tempdir().unwrap();
    helpers::stage_archive(root.path(), "arch_a_1", "arch_a", "hello\n");
    let state = app_state(root.path());

    let Json(submitted) = submit_download(State(state.clone()), Json(request("arch_a")))
        .await
        .expect("submission should succeed");

    let (code, Json(body)) = get_status(
        State(state.clone()),
        UrlPath(submitted.job_id.to_string()),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body.state, SemanticState::Pending);

    // Drive the job the way the worker does.
    let job = state.store.claim_next().await.unwrap().unwrap();
    let result = archive_verify::services::workflow::execute(&job, &state.config).await;
    state.store.store_result(job.job_id, result).await.unwrap();

    let (code, Json(body)) = get_status(
        State(state.clone()),
        UrlPath(submitted.job_id.to_string()),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body.state, SemanticState::Done);
    assert!(body.msg.contains("verified"));

    // Terminal read consumed the job.
    let (code, Json(body)) =
        get_status(State(state), UrlPath(submitted.job_id.to_string())).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(body.msg.contains("no such job"));
}
