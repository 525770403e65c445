//! Reading Broadcaster
//!
//! Delivers newly-arrived readings to the filter-matching members of the
//! owning room. The ingestion path calls [`Broadcaster::publish`] once per
//! reading, after the reading has been recorded.

use std::sync::Arc;

use super::frames::ServerFrame;
use super::registry::{RoomKey, RoomRegistry};
use crate::reading::Reading;

/// Fans one reading out to every session watching its sensor with a
/// matching reading-type filter.
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver one reading to the room for (`group_id`, `sensor_id`).
    ///
    /// Works from a point-in-time membership snapshot, so room mutations
    /// racing this call neither block nor corrupt delivery. Per session
    /// the delivery is best-effort: an unreachable session is skipped and
    /// the rest of the room still receives the reading. Readings published
    /// sequentially reach each session in publish order, since frames are
    /// enqueued inline on the session's FIFO channel.
    pub async fn publish(&self, group_id: i64, sensor_id: i64, reading: Reading) {
        let room = RoomKey {
            group_id,
            sensor_id,
        };
        let members = self.registry.snapshot(room).await;
        if members.is_empty() {
            return;
        }

        let mut delivered = 0usize;
        for (session_id, filter) in members {
            if filter != reading.rtypeid {
                continue;
            }
            let frame = ServerFrame::RespReading {
                readings: vec![reading.clone()],
            };
            match self.registry.send_to(&session_id, frame).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(
                        session_id = %session_id,
                        error = %e,
                        "Skipping unreachable session during broadcast"
                    );
                }
            }
        }

        if delivered > 0 {
            tracing::trace!(
                group_id,
                sensor_id,
                rtypeid = reading.rtypeid,
                delivered,
                "Broadcast reading"
            );
        }
    }
}
