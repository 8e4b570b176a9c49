use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qbench_worker::broker::AmqpTaskSource;
use qbench_worker::callback::ResultReporter;
use qbench_worker::config::WorkerConfig;
use qbench_worker::engine::QuantmarkEngine;
use qbench_worker::runner::Worker;
use qbench_worker::task::TaskHandler;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qbench_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        queue = %config.queue,
        callback_url = %config.callback_url,
        work_dir = %config.work_dir.display(),
        task_isolation = config.task_isolation,
        "Loaded worker configuration"
    );

    // --- Components ---
    let engine = Arc::new(QuantmarkEngine::from_config(&config));
    let reporter = ResultReporter::new(
        config.callback_url.clone(),
        Duration::from_secs(config.callback_timeout_secs),
        config.callback_max_retries,
    )
    .expect("Failed to build HTTP client");
    let handler = TaskHandler::new(
        engine,
        reporter,
        config.work_dir.clone(),
        config.task_isolation,
    );
    let source =
        AmqpTaskSource::new(&config.broker_url, &config.queue).expect("Invalid BROKER_URL");

    // --- Run ---
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    tracing::info!("Worker starting");
    Worker::new(source, handler).run(cancel).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), finishing current task");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, finishing current task");
        }
    }
}
