//! Outbound Frame Types
//!
//! Every frame the server sends to a viewer is a `cmd`-tagged JSON object.
//! Query failures get a command-specific error frame so dashboards can tie
//! the failure back to the request that caused it; protocol violations get
//! the generic `RESP_ERROR`.

use serde::Serialize;

use crate::gateway::SensorStats;
use crate::reading::Reading;

/// Frames sent from server to viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerFrame {
    /// Outcome of a join request.
    RespJoin {
        /// Whether the session is now a member of the requested room.
        join_status: bool,
    },
    /// Historical readings sent after a successful stream switch.
    RespStream {
        /// Most recent readings of the selected type, newest first.
        readings: Vec<Reading>,
    },
    /// Aggregate statistics for a sensor over a requested window.
    RespSensorStats {
        stats: SensorStats,
    },
    /// Every reading for a sensor in a requested window.
    RespDownload {
        data: Vec<Reading>,
    },
    /// A live reading pushed to filter-matching room members.
    RespReading {
        readings: Vec<Reading>,
    },
    /// Stream switch failed.
    RespStreamError {
        error: String,
    },
    /// Statistics query failed.
    RespSensorStatsError {
        error: String,
    },
    /// Download query failed.
    RespDownloadError {
        error: String,
    },
    /// Malformed or invalid frame; the connection stays open.
    RespError {
        error: String,
    },
}
