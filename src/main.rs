// Main entry point - Dependency injection and server setup
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, routing::get};
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use grill_telemetry::application::cook_repository::CookRepository;
use grill_telemetry::application::idle_monitor::IdleMonitor;
use grill_telemetry::application::ingestor::ReadingIngestor;
use grill_telemetry::application::session_ledger::SessionLedger;
use grill_telemetry::application::state_tracker::StateTracker;
use grill_telemetry::application::telemetry_cache::TelemetryCache;
use grill_telemetry::infrastructure::config::load_config;
use grill_telemetry::infrastructure::device_client::DeviceClient;
use grill_telemetry::infrastructure::simulator::Simulator;
use grill_telemetry::infrastructure::sqlite_repository::SqliteRepository;
use grill_telemetry::presentation::app_state::AppState;
use grill_telemetry::presentation::handlers::{
    current_stats, health_check, list_sessions, reading_history, stream_readings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_config()?;

    // Create repository (infrastructure layer)
    let repository: Arc<dyn CookRepository> =
        Arc::new(SqliteRepository::open(PathBuf::from(&config.database.path))?);

    // Create services (application layer)
    let cache = Arc::new(TelemetryCache::new(config.history.capacity));
    let ledger = SessionLedger::new(repository.clone());
    let tracker = StateTracker::new(cache.clone(), ledger.clone(), repository.clone());
    let idle_monitor = IdleMonitor::new(
        cache.clone(),
        ledger.clone(),
        config.idle.wake_threshold_secs,
        config.idle.check_interval_secs,
    );

    // Wire the configured telemetry source into the ingest loop
    let (sample_tx, sample_rx) = tokio::sync::mpsc::channel(100);
    let shutdown = CancellationToken::new();

    if config.simulate {
        let simulator = Simulator::new(config.simulation.clone());
        tokio::spawn(simulator.run(sample_tx, shutdown.clone()));
    } else {
        let device = DeviceClient::new(&config.device);
        tokio::spawn(device.run(sample_tx, shutdown.clone()));
    }

    let ingestor = ReadingIngestor::new(tracker);
    tokio::spawn({
        let cancel = shutdown.clone();
        async move { ingestor.run(sample_rx, cancel).await }
    });

    tokio::spawn({
        let cancel = shutdown.clone();
        async move { idle_monitor.run(cancel).await }
    });

    // Create application state
    let state = Arc::new(AppState {
        cache,
        ledger,
        simulate: config.simulate,
        wake_threshold_secs: config.idle.wake_threshold_secs,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/stats", get(current_stats))
        .route("/api/history", get(reading_history))
        .route("/api/sessions", get(list_sessions))
        .route("/api/stream", get(stream_readings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    println!("Starting grill-telemetry service on {}", addr);

    let signal_token = shutdown.clone();
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received ctrl-c, shutting down"),
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
            signal_token.cancel();
        })
        .await?;

    // Cancel is idempotent if ctrl-c already fired; the loops stop before
    // the repository drops, so queued writes drain on the database thread.
    shutdown.cancel();

    Ok(())
}
