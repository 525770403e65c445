//! Inbound Commands
//!
//! A single validating parse turns a raw text frame into a typed
//! [`Command`]. Every field check happens here, before any handler logic
//! runs; a frame that fails produces no side effects at all.
//!
//! Dashboards transmit integer fields as JSON numbers or as numeric
//! strings (form inputs arrive stringly), so both are accepted.

use serde_json::{Map, Value};
use thiserror::Error;

use super::registry::RoomKey;

/// A validated viewer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start watching a sensor room.
    Join { room: RoomKey },
    /// Leave the room and end the session.
    Close { room: RoomKey },
    /// Switch the session's reading-type filter.
    ChangeStream { room: RoomKey, rtypeid: i64 },
    /// Request aggregate statistics over a window.
    SensorStats {
        room: RoomKey,
        rtypeid: i64,
        start_ts: i64,
        end_ts: i64,
    },
    /// Request every reading in a window.
    Download {
        room: RoomKey,
        start_ts: i64,
        end_ts: i64,
    },
}

/// Why an inbound frame was rejected. The message names the violated
/// precondition and is sent back verbatim in a `RESP_ERROR` frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Frame is not valid JSON: {0}")]
    Syntax(String),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{0}' must be an integer")]
    InvalidField(&'static str),

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
}

impl Command {
    /// Parse and validate one inbound text frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FrameError::Syntax(e.to_string()))?;
        let obj = value.as_object().ok_or(FrameError::NotAnObject)?;

        let cmd = obj
            .get("cmd")
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingField("cmd"))?;

        // Every command addresses one sensor room.
        let room = RoomKey {
            group_id: int_field(obj, "groupid")?,
            sensor_id: int_field(obj, "sensorid")?,
        };

        match cmd {
            "RQST_JOIN" => Ok(Command::Join { room }),
            "RQST_CLOSE" => Ok(Command::Close { room }),
            "RQST_STREAM" => Ok(Command::ChangeStream {
                room,
                rtypeid: int_field(obj, "rtypeid")?,
            }),
            "RQST_SENSOR_STATS" => Ok(Command::SensorStats {
                room,
                rtypeid: int_field(obj, "rtypeid")?,
                start_ts: int_field(obj, "start_ts")?,
                end_ts: int_field(obj, "end_ts")?,
            }),
            "RQST_DOWNLOAD" => Ok(Command::Download {
                room,
                start_ts: int_field(obj, "start_ts")?,
                end_ts: int_field(obj, "end_ts")?,
            }),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }
}

/// Read an integer field, accepting JSON numbers and numeric strings.
fn int_field(obj: &Map<String, Value>, name: &'static str) -> Result<i64, FrameError> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(FrameError::MissingField(name)),
        Some(Value::Number(n)) => n.as_i64().ok_or(FrameError::InvalidField(name)),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| FrameError::InvalidField(name)),
        Some(_) => Err(FrameError::InvalidField(name)),
    }
}
