use std::sync::Arc;

use attendance_engine::api::{AppState, create_router};
use attendance_engine::clock::SystemClock;
use attendance_engine::config::ConfigLoader;
use attendance_engine::storage::MemoryStore;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_DIR_VAR: &str = "ATTENDANCE_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = "./config/default";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_dir =
        std::env::var(CONFIG_DIR_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let config = ConfigLoader::load(&config_dir)?.into_config();
    info!(
        config_dir = %config_dir,
        timezone = %config.calendar.timezone(),
        fallback_offices = config.fallback_offices.len(),
        seed_users = config.seed_users.len(),
        "Configuration loaded"
    );

    let store = Arc::new(MemoryStore::with_users(config.seed_users.clone()));
    let state = AppState::new(&config, store, Arc::new(SystemClock));
    let app = create_router(state.clone()).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on http://{}", config.server.bind_address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining payroll recompute queue");
    state.recompute_queue().shutdown().await;
    let failed = state.recompute_queue().failed_jobs();
    if !failed.is_empty() {
        warn!(count = failed.len(), "Payroll recompute jobs failed permanently");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
