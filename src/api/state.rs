//! Application State
//!
//! Shared state accessible by all handlers, wrapped in Arc for sharing
//! across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::gateway::DataGateway;
use crate::ws::{Broadcaster, Dispatcher, RegistryConfig, RoomRegistry};

/// Shared application state for all handlers.
pub struct AppState {
    /// Room registry tracking viewer sessions.
    pub registry: Arc<RoomRegistry>,
    /// Command dispatcher shared by every connection.
    pub dispatcher: Arc<Dispatcher>,
    /// Broadcaster invoked by the ingestion path.
    pub broadcaster: Arc<Broadcaster>,
    /// Backend holding historical readings.
    pub gateway: Arc<dyn DataGateway>,
    /// Server start time for uptime tracking.
    pub start_time: Instant,
}

impl AppState {
    /// Wire the streaming core around a gateway.
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        registry_config: RegistryConfig,
        stream_history_limit: usize,
    ) -> Self {
        let registry = Arc::new(RoomRegistry::new(registry_config));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&gateway),
            stream_history_limit,
        ));
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));

        Self {
            registry,
            dispatcher,
            broadcaster,
            gateway,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
