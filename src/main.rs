//! voicetime — voice channel presence and time accrual exporter
//!
//! Main entry point that wires the gateway, tracker and metrics crates
//! together.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing_subscriber::{EnvFilter, fmt};

use voicetime_core::config::AppConfig;
use voicetime_core::error::AppError;
use voicetime_core::result::AppResult;
use voicetime_gateway::{GatewayClient, NameCache};
use voicetime_metrics::{MetricsExporter, PrometheusSink};
use voicetime_tracker::{PresenceEngine, TrackerRunner};

/// How long each background task gets to stop after shutdown.
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("voicetime error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment, then validate it
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("VOICETIME_ENV").unwrap_or_else(|_| "development".to_string());

    let config = AppConfig::load(&env)?;
    config.validate()?;

    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting voicetime v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Metrics sink ─────────────────────────────────────
    let sink = Arc::new(PrometheusSink::new()?);

    // ── Step 2: Name directory ───────────────────────────────────
    let names = Arc::new(NameCache::new());

    // ── Step 3: Presence engine ──────────────────────────────────
    let engine = Arc::new(PresenceEngine::new(
        sink.clone(),
        names.clone(),
        Instant::now(),
    ));

    // ── Step 4: Shutdown and event channels ──────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let (event_tx, event_rx) = mpsc::channel(config.gateway.event_buffer_size);

    // ── Step 5: Tracker loop ─────────────────────────────────────
    let runner = TrackerRunner::new(Arc::clone(&engine), &config.accrual);
    let tracker_cancel = shutdown_rx.clone();
    let tracker_handle = spawn_guarded("Tracker", Arc::clone(&shutdown_tx), async move {
        runner.run(event_rx, tracker_cancel).await;
        Ok(())
    });

    // ── Step 6: Metrics exporter ─────────────────────────────────
    let exporter = MetricsExporter::new(Arc::clone(&sink), config.metrics.clone());
    let exporter_cancel = shutdown_rx.clone();
    let exporter_handle = spawn_guarded("Metrics exporter", Arc::clone(&shutdown_tx), async move {
        exporter.serve(exporter_cancel).await
    });

    // ── Step 7: Gateway client ───────────────────────────────────
    tracing::info!("Connecting to the gateway...");
    let client = GatewayClient::new(config.gateway.clone(), Arc::clone(&names));
    let gateway_handle = spawn_guarded(
        "Gateway client",
        Arc::clone(&shutdown_tx),
        client.run(event_tx, shutdown_rx.clone()),
    );

    // ── Step 8: Wait for shutdown ────────────────────────────────
    let mut stopped = shutdown_rx.clone();
    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        }
        _ = stopped.changed() => {
            tracing::warn!("A background task stopped, shutting down...");
        }
    }
    let _ = shutdown_tx.send(true);

    // ── Step 9: Wait for background tasks ────────────────────────
    tracing::info!("Waiting for background tasks to complete...");

    let mut result = Ok(());
    for (name, handle) in [
        ("Gateway client", gateway_handle),
        ("Metrics exporter", exporter_handle),
        ("Tracker", tracker_handle),
    ] {
        match tokio::time::timeout(TASK_STOP_TIMEOUT, handle).await {
            Ok(Ok(Err(e))) if result.is_ok() => result = Err(e),
            Ok(Err(e)) => tracing::warn!("{} task panicked: {}", name, e),
            Err(_) => tracing::warn!("{} did not stop within {:?}", name, TASK_STOP_TIMEOUT),
            _ => {}
        }
    }

    tracing::info!("voicetime shut down gracefully");
    result
}

/// Spawn a task that triggers shutdown when it fails or panics
fn spawn_guarded<F>(
    name: &'static str,
    shutdown: Arc<watch::Sender<bool>>,
    task: F,
) -> JoinHandle<AppResult<()>>
where
    F: Future<Output = AppResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = match tokio::spawn(task).await {
            Ok(result) => result,
            Err(e) => Err(AppError::internal(format!("{} task panicked: {}", name, e))),
        };
        if let Err(e) = &result {
            tracing::error!("{} failed: {}", name, e);
            let _ = shutdown.send(true);
        }
        result
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
