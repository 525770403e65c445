//! Data Gateway
//!
//! Interface to the store that holds historical readings. The core never
//! persists anything itself; it queries whatever backend implements
//! [`DataGateway`]. An in-memory implementation is provided for the
//! standalone server and for tests; a real storage backend implements the
//! same trait.

mod memory;

pub use memory::MemoryGateway;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::reading::Reading;

/// Aggregate statistics for one sensor's readings over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStats {
    /// Number of readings in the window.
    pub count: usize,
    /// Smallest value, absent when the window is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Largest value, absent when the window is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Mean value, absent when the window is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
}

/// Storage backend for historical readings and aggregate statistics.
///
/// All failures surface as [`GatewayError`], distinct from frame validation
/// errors; callers report them to the requesting viewer without tearing
/// down the session.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Most recent readings of one type for a sensor, newest first,
    /// bounded by `limit`.
    async fn readings(
        &self,
        sensor_id: i64,
        group_id: i64,
        rtypeid: i64,
        limit: usize,
    ) -> Result<Vec<Reading>, GatewayError>;

    /// Aggregate statistics over `[start_ts, end_ts]` for one reading type.
    async fn sensor_stats(
        &self,
        sensor_id: i64,
        group_id: i64,
        rtypeid: i64,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<SensorStats, GatewayError>;

    /// All readings for a sensor in `[start_ts, end_ts]`, ascending by
    /// timestamp, regardless of reading type.
    async fn readings_by_period(
        &self,
        sensor_id: i64,
        group_id: i64,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<Reading>, GatewayError>;

    /// Record a newly received reading.
    async fn insert_reading(
        &self,
        group_id: i64,
        sensor_id: i64,
        reading: Reading,
    ) -> Result<(), GatewayError>;
}

/// Errors surfaced by a [`DataGateway`] implementation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
