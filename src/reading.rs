//! Sensor Readings
//!
//! The immutable value delivered to viewers and returned from history
//! queries. A reading carries its timestamp, measured value, reading-type
//! id, and a derived human-readable rendering.

use chrono::{TimeZone, Utc};
use serde::Serialize;

/// A single sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Seconds since the Unix epoch.
    pub ts: i64,
    /// Measured value.
    pub val: f64,
    /// Reading-type id.
    pub rtypeid: i64,
    /// Human-readable rendering, derived from `ts` and `val`.
    pub rstring: String,
}

impl Reading {
    /// Create a reading, deriving its display string.
    pub fn new(ts: i64, val: f64, rtypeid: i64) -> Self {
        Self {
            ts,
            val,
            rtypeid,
            rstring: format_reading(ts, val),
        }
    }
}

/// Format a reading's timestamp and value for display.
///
/// Timestamps outside chrono's representable range fall back to the raw
/// epoch value.
pub fn format_reading(ts: i64, val: f64) -> String {
    let when = match Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%a %d.%m.%Y %H:%M:%S").to_string(),
        None => ts.to_string(),
    };
    format!("Time: {}, Value: {}", when, val)
}
