//! Data Transfer Objects
//!
//! Request and response types for the HTTP endpoints. Field names match
//! the WebSocket wire protocol so ingestion tooling speaks one dialect.

use serde::{Deserialize, Serialize};

/// Single reading ingest request
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Group the sensor belongs to
    pub groupid: i64,
    /// Sensor the reading came from
    pub sensorid: i64,
    /// Reading-type id
    pub rtypeid: i64,
    /// Measured value
    pub val: f64,
    /// Optional timestamp (seconds since epoch), defaults to now
    #[serde(default)]
    pub ts: Option<i64>,
}

/// Single reading ingest response
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Status: "ok"
    pub status: String,
    /// Timestamp of the recorded reading
    pub ts: i64,
}

/// Full health payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok"
    pub status: String,
    /// Seconds since the server started
    pub uptime_seconds: u64,
    /// Connected viewer sessions
    pub sessions: usize,
    /// Rooms ever joined (empty rooms included)
    pub rooms: usize,
}
