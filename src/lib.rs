//! # Sensorium
//!
//! Live sensor telemetry over WebSocket. Viewers join a (group, sensor)
//! room, pick a reading type to follow, and receive matching readings the
//! moment they arrive, alongside history and statistics queries served
//! from a pluggable data gateway.
//!
//! ## Modules
//!
//! - [`ws`]: room registry, command dispatch, broadcast, and shutdown
//! - [`gateway`]: data gateway trait plus the in-memory backend
//! - [`api`]: HTTP surface (ingest, health, WebSocket upgrade) with Axum
//! - [`config`]: TOML/environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sensorium::api::{serve, AppState};
//! use sensorium::config::Config;
//! use sensorium::gateway::MemoryGateway;
//! use sensorium::ws::RegistryConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!
//!     let gateway = Arc::new(MemoryGateway::new());
//!     let state = AppState::new(
//!         gateway,
//!         RegistryConfig {
//!             max_sessions: config.registry.max_sessions,
//!         },
//!         config.registry.stream_history_limit,
//!     );
//!
//!     serve(state, &config.server).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod gateway;
pub mod reading;
pub mod ws;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, ApiResult, AppState};

pub use config::{
    Config, ConfigError, LoggingConfig, RegistryConfig as ConfigRegistryConfig, ServerConfig,
};

pub use gateway::{DataGateway, GatewayError, MemoryGateway, SensorStats};

pub use reading::Reading;

pub use ws::{
    websocket_handler, Broadcaster, Command, Dispatch, Dispatcher, FrameError, RegistryConfig,
    RegistryError, RoomKey, RoomRegistry, ServerFrame, SessionId, SessionMessage,
    ShutdownCoordinator, FILTER_NONE, SHUTDOWN_REASON,
};
