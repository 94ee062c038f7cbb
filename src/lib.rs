pub mod api; // HTTP/JSON API
pub mod appointment; // Appointment lifecycle registry
pub mod config;
pub mod core_state; // Sessions + audit, shared by all requests
pub mod models;
pub mod seed; // Demo appointments
pub mod session; // Signed-in actor

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Serve the API until Ctrl-C.
pub async fn run() -> Result<(), String> {
    init_tracing();

    let config = config::ServerConfig::from_env();
    tracing::info!(
        addr = %config.socket_addr(),
        seed_demo = config.seed_demo,
        "{} starting v{}",
        config::APP_NAME,
        config::APP_VERSION
    );

    let addr = config.socket_addr();
    let core = Arc::new(core_state::CoreState::new(config));
    let server = api::server::start_api_server(core, addr).await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))?;

    server.stop().await;
    Ok(())
}
