//! Real-Time Viewer Sessions
//!
//! Streams live sensor readings to connected dashboard viewers over
//! WebSocket. Each viewer watches one (group, sensor) room and narrows the
//! stream to a single reading type at a time.
//!
//! ## Architecture
//!
//! - **RoomRegistry**: owns all room membership and session state
//! - **Dispatcher**: parses, validates, and executes inbound commands
//! - **Broadcaster**: fans new readings out to filter-matching members
//! - **ShutdownCoordinator**: closes every session on server shutdown
//! - **Handler**: WebSocket upgrade and per-connection loop
//!
//! ## Protocol
//!
//! Viewers connect to `/ws` and exchange `cmd`-tagged JSON frames:
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8090/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({cmd: 'RQST_JOIN', groupid: 1, sensorid: 5}));
//!   ws.send(JSON.stringify({cmd: 'RQST_STREAM', groupid: 1, sensorid: 5, rtypeid: 3}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const frame = JSON.parse(event.data);
//!   if (frame.cmd === 'RESP_READING') { render(frame.readings); }
//! };
//! ```

mod broadcaster;
mod commands;
mod dispatcher;
mod frames;
mod handler;
mod registry;
mod shutdown;

pub use broadcaster::Broadcaster;
pub use commands::{Command, FrameError};
pub use dispatcher::{Dispatch, Dispatcher};
pub use frames::ServerFrame;
pub use handler::websocket_handler;
pub use registry::{
    RegistryConfig, RegistryError, RoomKey, RoomRegistry, SessionId, SessionMessage, FILTER_NONE,
};
pub use shutdown::{ShutdownCoordinator, SHUTDOWN_REASON};
