use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use archive_verify::config::AppConfig;
use archive_verify::services::queue::{JobStore, QueueError, RedisJobStore};
use archive_verify::services::workflow;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting archive verification worker");

    // Load configuration
    let config = Arc::new(AppConfig::from_env().expect("Failed to load configuration"));

    // Initialize Redis job store
    tracing::info!("Connecting to Redis job queue");
    let store: Arc<dyn JobStore> =
        Arc::new(RedisJobStore::new(&config.redis_url).expect("Failed to initialize job store"));

    tracing::info!("Worker ready, starting job processing loop");

    // Main processing loop
    loop {
        match process_next_job(store.as_ref(), &config).await {
            Ok(true) => {
                tracing::debug!("Job processed, checking for next job");
            }
            Ok(false) => {
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing job, backing off");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}

/// Claim and execute the next job from the queue.
/// Returns Ok(true) if a job was processed, Ok(false) if no job available.
async fn process_next_job(store: &dyn JobStore, config: &Arc<AppConfig>) -> Result<bool, QueueError> {
    let Some(job) = store.claim_next().await? else {
        return Ok(false);
    };

    tracing::info!(
        job_id = %job.job_id,
        archive = %job.archive,
        retain = job.retain,
        "Processing verification job"
    );

    if let Ok(depth) = store.depth().await {
        metrics::gauge!("archive_verify_queue_depth").set(depth as f64);
    }

    let start = std::time::Instant::now();
    let timeout = Duration::from_secs(config.job_timeout_secs);

    // The workflow runs on its own task so a panic inside it surfaces as
    // a join error instead of taking the worker down.
    let mut handle = tokio::spawn({
        let job = job.clone();
        let config = Arc::clone(config);
        async move { workflow::execute(&job, &config).await }
    });

    let outcome = tokio::time::timeout(timeout, &mut handle).await;
    metrics::histogram!("archive_verify_processing_seconds").record(start.elapsed().as_secs_f64());

    match outcome {
        Ok(Ok(result)) => {
            metrics::counter!("archive_verify_jobs_completed").increment(1);
            tracing::info!(
                job_id = %job.job_id,
                outcome = ?result.outcome,
                "Job completed"
            );
            store.store_result(job.job_id, result).await?;
        }
        Ok(Err(join_err)) => {
            metrics::counter!("archive_verify_jobs_failed").increment(1);
            tracing::error!(job_id = %job.job_id, error = %join_err, "Job crashed");
            store
                .store_fault(job.job_id, format!("job execution crashed: {join_err}"))
                .await?;
        }
        Err(_elapsed) => {
            handle.abort();
            metrics::counter!("archive_verify_jobs_failed").increment(1);
            tracing::error!(
                job_id = %job.job_id,
                timeout_secs = config.job_timeout_secs,
                "Job timed out"
            );
            store
                .store_fault(
                    job.job_id,
                    format!(
                        "job execution exceeded timeout of {}s",
                        config.job_timeout_secs
                    ),
                )
                .await?;
        }
    }

    Ok(true)
}
