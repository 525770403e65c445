//! Room Registry
//!
//! Owns all room membership state: which sessions watch which
//! (group, sensor) pair and which reading type each of them has selected.
//! The registry is the only shared mutable state in the streaming core;
//! every per-connection task and the ingestion path go through its
//! synchronized operations.
//!
//! Lock order is `sessions` before `rooms` whenever both are held.
//! Operations only enqueue on a session's unbounded channel; the network
//! send happens in that session's writer task, so no socket I/O ever runs
//! under a registry lock.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::frames::ServerFrame;

/// Unique identifier for one viewer connection.
pub type SessionId = String;

/// Reading-type filter meaning "no type selected yet". Sessions join with
/// this filter and receive no broadcasts until they switch streams.
pub const FILTER_NONE: i64 = 0;

/// A (group, sensor) pair identifying one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomKey {
    pub group_id: i64,
    pub sensor_id: i64,
}

/// Instruction for a session's writer task.
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Serialize and send a frame.
    Frame(ServerFrame),
    /// Send a WebSocket close frame and stop the writer.
    Close { code: u16, reason: &'static str },
}

/// Per-session bookkeeping: the outbound channel plus the room the session
/// currently belongs to, consulted for O(1) cleanup on disconnect.
struct SessionHandle {
    sender: mpsc::UnboundedSender<SessionMessage>,
    room: Option<RoomKey>,
}

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of concurrently registered sessions.
    pub max_sessions: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_sessions: 1000 }
    }
}

/// Errors that can occur in the room registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Too many sessions (limit: {0})")]
    TooManySessions(usize),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session channel closed")]
    SendFailed,
}

/// Tracks which sessions watch which sensor room.
///
/// Rooms are created lazily on first join and never destroyed; an empty
/// room is a valid, harmless state. A session belongs to at most one room
/// at a time; joining a second room moves it out of the first.
pub struct RoomRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    rooms: RwLock<HashMap<RoomKey, HashMap<SessionId, i64>>>,
    config: RegistryConfig,
}

impl RoomRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a new viewer connection.
    ///
    /// Returns the minted session id, or an error once the session limit
    /// is reached.
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<SessionMessage>,
    ) -> Result<SessionId, RegistryError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.config.max_sessions {
            return Err(RegistryError::TooManySessions(self.config.max_sessions));
        }

        let id = Uuid::new_v4().to_string();
        sessions.insert(
            id.clone(),
            SessionHandle {
                sender,
                room: None,
            },
        );

        tracing::info!(session_id = %id, "Session connected");
        Ok(id)
    }

    /// Unregister a session and remove all trace of it from its room.
    /// Idempotent; called exactly once per connection on close, whether the
    /// viewer requested it or the connection dropped.
    pub async fn unregister(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.remove(id) {
            if let Some(key) = handle.room {
                let mut rooms = self.rooms.write().await;
                if let Some(members) = rooms.get_mut(&key) {
                    members.remove(id);
                }
            }
            tracing::info!(session_id = %id, "Session disconnected");
        }
    }

    /// Add a session to a room, creating the room if needed.
    ///
    /// Idempotent: joining a room the session is already in changes
    /// nothing and still succeeds. Joining a different room moves the
    /// session out of its previous one. Returns false only when the
    /// session is not registered.
    pub async fn join(&self, room: RoomKey, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(handle) = sessions.get_mut(id) else {
            return false;
        };
        let previous = handle.room.replace(room);

        let mut rooms = self.rooms.write().await;
        if let Some(old) = previous.filter(|old| *old != room) {
            if let Some(members) = rooms.get_mut(&old) {
                members.remove(id);
            }
        }
        rooms
            .entry(room)
            .or_default()
            .entry(id.to_string())
            .or_insert(FILTER_NONE);

        tracing::debug!(
            session_id = %id,
            group_id = room.group_id,
            sensor_id = room.sensor_id,
            "Session joined room"
        );
        true
    }

    /// Remove a session from a room. No-op if the room or the membership
    /// does not exist; safe to call twice.
    pub async fn leave(&self, room: RoomKey, id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get_mut(id) {
            if handle.room == Some(room) {
                handle.room = None;
            }
        }

        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(&room) {
            if members.remove(id).is_some() {
                tracing::debug!(
                    session_id = %id,
                    group_id = room.group_id,
                    sensor_id = room.sensor_id,
                    "Session left room"
                );
            }
        }
    }

    /// Update a session's reading-type filter. Returns false if the
    /// session has not joined the room.
    pub async fn change_stream(&self, room: RoomKey, id: &str, rtypeid: i64) -> bool {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(&room).and_then(|members| members.get_mut(id)) {
            Some(filter) => {
                *filter = rtypeid;
                true
            }
            None => false,
        }
    }

    /// Membership test.
    pub async fn is_member(&self, room: RoomKey, id: &str) -> bool {
        self.rooms
            .read()
            .await
            .get(&room)
            .is_some_and(|members| members.contains_key(id))
    }

    /// Point-in-time copy of a room's membership, taken under the lock.
    /// Never a live view; concurrent joins and leaves do not show up in a
    /// snapshot already returned.
    pub async fn snapshot(&self, room: RoomKey) -> Vec<(SessionId, i64)> {
        self.rooms
            .read()
            .await
            .get(&room)
            .map(|members| {
                members
                    .iter()
                    .map(|(id, filter)| (id.clone(), *filter))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove a session from whatever room it belongs to. No-op for a
    /// session in no room.
    pub async fn remove_everywhere(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        let room = sessions.get_mut(id).and_then(|handle| handle.room.take());
        if let Some(key) = room {
            let mut rooms = self.rooms.write().await;
            if let Some(members) = rooms.get_mut(&key) {
                members.remove(id);
            }
        }
    }

    /// Enqueue a frame for one session. Never blocks: the frame lands on
    /// the session's unbounded channel and its writer task performs the
    /// actual network send.
    pub async fn send_to(&self, id: &str, frame: ServerFrame) -> Result<(), RegistryError> {
        let sessions = self.sessions.read().await;
        let handle = sessions.get(id).ok_or(RegistryError::SessionNotFound)?;
        handle
            .sender
            .send(SessionMessage::Frame(frame))
            .map_err(|_| RegistryError::SendFailed)
    }

    /// Ask a session's writer task to close the connection. Tolerates
    /// sessions that are already gone.
    pub async fn close_session(&self, id: &str, code: u16, reason: &'static str) {
        let sessions = self.sessions.read().await;
        if let Some(handle) = sessions.get(id) {
            let _ = handle.sender.send(SessionMessage::Close { code, reason });
        }
    }

    /// Ids of every registered session, in or out of a room.
    pub async fn all_sessions(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Number of registered sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of rooms ever joined, empty ones included.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const ROOM: RoomKey = RoomKey {
        group_id: 1,
        sensor_id: 5,
    };

    const OTHER_ROOM: RoomKey = RoomKey {
        group_id: 2,
        sensor_id: 9,
    };

    async fn registered(
        registry: &RoomRegistry,
    ) -> (SessionId, mpsc::UnboundedReceiver<SessionMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = registry.register(tx).await.unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn test_join_creates_room_with_default_filter() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let (id, _rx) = registered(&registry).await;

        assert!(registry.join(ROOM, &id).await);
        assert!(registry.is_member(ROOM, &id).await);
        assert_eq!(registry.snapshot(ROOM).await, vec![(id, FILTER_NONE)]);
    }

    #[tokio::test]
    async fn test_join_twice_is_idempotent() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let (id, _rx) = registered(&registry).await;

        registry.join(ROOM, &id).await;
        registry.change_stream(ROOM, &id, 3).await;
        assert!(registry.join(ROOM, &id).await);

        // Second join neither duplicates the entry nor resets the filter.
        assert_eq!(registry.snapshot(ROOM).await, vec![(id, 3)]);
    }

    #[tokio::test]
    async fn test_join_unregistered_session_fails() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        assert!(!registry.join(ROOM, "nobody").await);
    }

    #[tokio::test]
    async fn test_join_second_room_moves_session() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let (id, _rx) = registered(&registry).await;

        registry.join(ROOM, &id).await;
        registry.join(OTHER_ROOM, &id).await;

        assert!(!registry.is_member(ROOM, &id).await);
        assert!(registry.is_member(OTHER_ROOM, &id).await);
    }

    #[tokio::test]
    async fn test_leave_is_noop_when_not_joined() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let (id, _rx) = registered(&registry).await;

        registry.leave(ROOM, &id).await;
        registry.leave(ROOM, &id).await;
        assert!(!registry.is_member(ROOM, &id).await);
    }

    #[tokio::test]
    async fn test_leave_keeps_empty_room() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let (id, _rx) = registered(&registry).await;

        registry.join(ROOM, &id).await;
        registry.leave(ROOM, &id).await;

        assert!(registry.snapshot(ROOM).await.is_empty());
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_change_stream_requires_membership() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let (id, _rx) = registered(&registry).await;

        assert!(!registry.change_stream(ROOM, &id, 3).await);

        registry.join(ROOM, &id).await;
        assert!(registry.change_stream(ROOM, &id, 3).await);
        assert_eq!(registry.snapshot(ROOM).await, vec![(id, 3)]);
    }

    #[tokio::test]
    async fn test_remove_everywhere_without_room_is_noop() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let (id, _rx) = registered(&registry).await;

        registry.remove_everywhere(&id).await;
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_removes_membership() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let (id, _rx) = registered(&registry).await;

        registry.join(ROOM, &id).await;
        registry.unregister(&id).await;
        registry.unregister(&id).await;

        assert!(!registry.is_member(ROOM, &id).await);
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let (id, _rx) = registered(&registry).await;

        registry.join(ROOM, &id).await;
        let snapshot = registry.snapshot(ROOM).await;

        registry.leave(ROOM, &id).await;
        assert_eq!(snapshot.len(), 1);
        assert!(registry.snapshot(ROOM).await.is_empty());
    }

    #[tokio::test]
    async fn test_session_limit() {
        let registry = RoomRegistry::new(RegistryConfig { max_sessions: 2 });

        let (_id1, _rx1) = registered(&registry).await;
        let (_id2, _rx2) = registered(&registry).await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = registry.register(tx).await;
        assert!(matches!(result, Err(RegistryError::TooManySessions(2))));
    }

    #[tokio::test]
    async fn test_concurrent_joins_lose_no_updates() {
        let registry = Arc::new(RoomRegistry::new(RegistryConfig::default()));
        let mut receivers = Vec::new();
        let mut handles = Vec::new();

        for _ in 0..32 {
            let (id, rx) = registered(&registry).await;
            receivers.push(rx);
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                assert!(registry.join(ROOM, &id).await);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.snapshot(ROOM).await.len(), 32);
    }

    #[tokio::test]
    async fn test_send_to_unknown_session() {
        let registry = RoomRegistry::new(RegistryConfig::default());
        let result = registry
            .send_to("nobody", ServerFrame::RespJoin { join_status: true })
            .await;
        assert!(matches!(result, Err(RegistryError::SessionNotFound)));
    }
}
