//! Shutdown Coordinator
//!
//! When the server goes down, every connected viewer is told why before
//! the process exits.

use std::sync::Arc;

use axum::extract::ws::close_code;

use super::registry::RoomRegistry;

/// Close reason sent to every viewer on server shutdown.
pub const SHUTDOWN_REASON: &str = "server shutdown";

/// Closes every registered session when the server shuts down.
pub struct ShutdownCoordinator {
    registry: Arc<RoomRegistry>,
}

impl ShutdownCoordinator {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Ask every session's writer task to close its connection with a
    /// "going away" code, regardless of what the session is doing.
    ///
    /// Works from a snapshot of the session table, so it completes even
    /// while disconnects race it; sessions that are already gone are
    /// skipped silently.
    pub async fn shutdown_all(&self) {
        let sessions = self.registry.all_sessions().await;
        tracing::info!(sessions = sessions.len(), "Closing all sessions for shutdown");

        for id in sessions {
            self.registry
                .close_session(&id, close_code::AWAY, SHUTDOWN_REASON)
                .await;
        }
    }
}
