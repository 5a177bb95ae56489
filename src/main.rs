use std::sync::Arc;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use archive_verify::app_state::AppState;
use archive_verify::config::AppConfig;
use archive_verify::routes;
use archive_verify::services::queue::RedisJobStore;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing archive-verify server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "archive_verify_jobs_submitted",
        "Total verification jobs submitted"
    );
    metrics::describe_counter!(
        "archive_verify_jobs_completed",
        "Total verification jobs that finished with a result"
    );
    metrics::describe_counter!(
        "archive_verify_jobs_failed",
        "Total verification jobs that faulted or timed out"
    );
    metrics::describe_gauge!(
        "archive_verify_queue_depth",
        "Current number of pending jobs in the queue"
    );
    metrics::describe_histogram!(
        "archive_verify_processing_seconds",
        "Time spent executing a verification job"
    );

    // Initialize Redis job store
    tracing::info!("Connecting to Redis job queue");
    let store = RedisJobStore::new(&config.redis_url).expect("Failed to initialize job store");

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, Arc::new(store));

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/verify", post(routes::verify::submit_verify))
        .route("/download", post(routes::verify::submit_download))
        .route("/status/{job_id}", get(routes::verify::get_status))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // requests are small JSON bodies

    tracing::info!("Starting archive-verify on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
