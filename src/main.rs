//! Sensorium Server
//!
//! Run with: cargo run
//!
//! # Configuration
//!
//! Loaded from config.toml (see [`sensorium::config`]) with environment
//! overrides:
//! - `SENSORIUM_HOST`: Host to bind to (default: 0.0.0.0)
//! - `SENSORIUM_PORT`: Port to listen on (default: 8090)
//! - `SENSORIUM_MAX_SESSIONS`: Concurrent viewer limit (default: 1000)
//! - `SENSORIUM_STREAM_HISTORY_LIMIT`: Readings returned on a stream
//!   switch (default: 100)
//! - `SENSORIUM_LOG_LEVEL` / `SENSORIUM_LOG_FORMAT`: Logging, unless
//!   `RUST_LOG` is set
//!
//! Readings enter through `POST /api/v1/ingest` and fan out to viewers
//! connected at `/ws`.

use std::sync::Arc;

use sensorium::api::{serve, AppState};
use sensorium::config::Config;
use sensorium::gateway::MemoryGateway;
use sensorium::ws::RegistryConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();
    init_tracing(&config);

    tracing::info!("Starting Sensorium server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Max sessions: {}", config.registry.max_sessions);

    let gateway = Arc::new(MemoryGateway::new());

    let state = AppState::new(
        gateway,
        RegistryConfig {
            max_sessions: config.registry.max_sessions,
        },
        config.registry.stream_history_limit,
    );

    serve(state, &config.server).await?;

    tracing::info!("Sensorium server stopped");
    Ok(())
}

/// Initialize tracing from `RUST_LOG`, falling back to the configured
/// level and format.
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "sensorium={},tower_http=debug",
            config.logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
