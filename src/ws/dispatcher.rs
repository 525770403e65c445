//! Command Dispatcher
//!
//! Drives one inbound frame through parse, execute, respond. Each frame is
//! independent; a failure anywhere short-circuits to an error response and
//! the session stays alive. Only `RQST_CLOSE` ends the loop.

use std::sync::Arc;

use super::commands::Command;
use super::frames::ServerFrame;
use super::registry::RoomRegistry;
use crate::gateway::DataGateway;

/// What the session loop should do after a frame was handled.
#[derive(Debug)]
pub enum Dispatch {
    /// Send this frame back to the session and keep reading.
    Reply(ServerFrame),
    /// The viewer asked to close; end the session.
    Close,
}

/// Executes validated commands against the room registry and the data
/// gateway. One dispatcher is shared by every connection.
pub struct Dispatcher {
    registry: Arc<RoomRegistry>,
    gateway: Arc<dyn DataGateway>,
    stream_history_limit: usize,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<RoomRegistry>,
        gateway: Arc<dyn DataGateway>,
        stream_history_limit: usize,
    ) -> Self {
        Self {
            registry,
            gateway,
            stream_history_limit,
        }
    }

    /// Handle one inbound text frame for `session_id`.
    pub async fn dispatch(&self, session_id: &str, text: &str) -> Dispatch {
        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "Rejected frame");
                return Dispatch::Reply(ServerFrame::RespError {
                    error: e.to_string(),
                });
            }
        };

        match command {
            Command::Join { room } => {
                let joined = self.registry.join(room, session_id).await;
                Dispatch::Reply(ServerFrame::RespJoin {
                    join_status: joined,
                })
            }

            Command::Close { room } => {
                self.registry.leave(room, session_id).await;
                Dispatch::Close
            }

            Command::ChangeStream { room, rtypeid } => {
                if !self.registry.change_stream(room, session_id, rtypeid).await {
                    return Dispatch::Reply(ServerFrame::RespStreamError {
                        error: "Cannot change stream before joining the sensor room".to_string(),
                    });
                }
                match self
                    .gateway
                    .readings(
                        room.sensor_id,
                        room.group_id,
                        rtypeid,
                        self.stream_history_limit,
                    )
                    .await
                {
                    Ok(readings) => Dispatch::Reply(ServerFrame::RespStream { readings }),
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %e,
                            "Stream history query failed"
                        );
                        Dispatch::Reply(ServerFrame::RespStreamError {
                            error: e.to_string(),
                        })
                    }
                }
            }

            Command::SensorStats {
                room,
                rtypeid,
                start_ts,
                end_ts,
            } => {
                match self
                    .gateway
                    .sensor_stats(room.sensor_id, room.group_id, rtypeid, start_ts, end_ts)
                    .await
                {
                    Ok(stats) => Dispatch::Reply(ServerFrame::RespSensorStats { stats }),
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %e,
                            "Stats query failed"
                        );
                        Dispatch::Reply(ServerFrame::RespSensorStatsError {
                            error: e.to_string(),
                        })
                    }
                }
            }

            Command::Download {
                room,
                start_ts,
                end_ts,
            } => {
                match self
                    .gateway
                    .readings_by_period(room.sensor_id, room.group_id, start_ts, end_ts)
                    .await
                {
                    Ok(data) => Dispatch::Reply(ServerFrame::RespDownload { data }),
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %e,
                            "Download query failed"
                        );
                        Dispatch::Reply(ServerFrame::RespDownloadError {
                            error: e.to_string(),
                        })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, MemoryGateway, SensorStats};
    use crate::reading::Reading;
    use crate::ws::registry::{RegistryConfig, RoomKey, SessionMessage};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    const ROOM: RoomKey = RoomKey {
        group_id: 1,
        sensor_id: 5,
    };

    /// Gateway stub whose every query fails at the storage level.
    struct FailingGateway;

    #[async_trait]
    impl DataGateway for FailingGateway {
        async fn readings(
            &self,
            _sensor_id: i64,
            _group_id: i64,
            _rtypeid: i64,
            _limit: usize,
        ) -> Result<Vec<Reading>, GatewayError> {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        }

        async fn sensor_stats(
            &self,
            _sensor_id: i64,
            _group_id: i64,
            _rtypeid: i64,
            _start_ts: i64,
            _end_ts: i64,
        ) -> Result<SensorStats, GatewayError> {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        }

        async fn readings_by_period(
            &self,
            _sensor_id: i64,
            _group_id: i64,
            _start_ts: i64,
            _end_ts: i64,
        ) -> Result<Vec<Reading>, GatewayError> {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        }

        async fn insert_reading(
            &self,
            _group_id: i64,
            _sensor_id: i64,
            _reading: Reading,
        ) -> Result<(), GatewayError> {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        }
    }

    async fn setup(
        gateway: Arc<dyn DataGateway>,
    ) -> (
        Arc<RoomRegistry>,
        Dispatcher,
        String,
        mpsc::UnboundedReceiver<SessionMessage>,
    ) {
        let registry = Arc::new(RoomRegistry::new(RegistryConfig::default()));
        let dispatcher = Dispatcher::new(Arc::clone(&registry), gateway, 100);
        let (tx, rx) = mpsc::unbounded_channel();
        let id = registry.register(tx).await.unwrap();
        (registry, dispatcher, id, rx)
    }

    #[tokio::test]
    async fn test_join_replies_with_status() {
        let (registry, dispatcher, id, _rx) = setup(Arc::new(MemoryGateway::new())).await;

        let outcome = dispatcher
            .dispatch(&id, r#"{"cmd":"RQST_JOIN","groupid":1,"sensorid":5}"#)
            .await;

        match outcome {
            Dispatch::Reply(frame) => {
                let json = serde_json::to_string(&frame).unwrap();
                assert_eq!(json, r#"{"cmd":"RESP_JOIN","join_status":true}"#);
            }
            other => panic!("Expected reply, got {:?}", other),
        }
        assert!(registry.is_member(ROOM, &id).await);
    }

    #[tokio::test]
    async fn test_close_leaves_room_and_ends_loop() {
        let (registry, dispatcher, id, _rx) = setup(Arc::new(MemoryGateway::new())).await;
        registry.join(ROOM, &id).await;

        let outcome = dispatcher
            .dispatch(&id, r#"{"cmd":"RQST_CLOSE","groupid":1,"sensorid":5}"#)
            .await;

        assert!(matches!(outcome, Dispatch::Close));
        assert!(!registry.is_member(ROOM, &id).await);
    }

    #[tokio::test]
    async fn test_stream_requires_membership() {
        let (_registry, dispatcher, id, _rx) = setup(Arc::new(MemoryGateway::new())).await;

        let outcome = dispatcher
            .dispatch(&id, r#"{"cmd":"RQST_STREAM","groupid":1,"sensorid":5,"rtypeid":3}"#)
            .await;

        match outcome {
            Dispatch::Reply(ServerFrame::RespStreamError { error }) => {
                assert!(error.contains("joining"));
            }
            other => panic!("Expected stream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_switches_filter_and_returns_history() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway
            .insert_reading(1, 5, Reading::new(100, 1.0, 3))
            .await
            .unwrap();
        gateway
            .insert_reading(1, 5, Reading::new(200, 2.0, 4))
            .await
            .unwrap();

        let (registry, dispatcher, id, _rx) = setup(gateway).await;
        registry.join(ROOM, &id).await;

        let outcome = dispatcher
            .dispatch(&id, r#"{"cmd":"RQST_STREAM","groupid":1,"sensorid":5,"rtypeid":3}"#)
            .await;

        match outcome {
            Dispatch::Reply(ServerFrame::RespStream { readings }) => {
                assert_eq!(readings.len(), 1);
                assert_eq!(readings[0].rtypeid, 3);
            }
            other => panic!("Expected stream reply, got {:?}", other),
        }
        assert_eq!(registry.snapshot(ROOM).await, vec![(id, 3)]);
    }

    #[tokio::test]
    async fn test_stats_gateway_fault_reports_error_frame() {
        let (registry, dispatcher, id, _rx) = setup(Arc::new(FailingGateway)).await;
        registry.join(ROOM, &id).await;

        let outcome = dispatcher
            .dispatch(
                &id,
                r#"{"cmd":"RQST_SENSOR_STATS","groupid":1,"sensorid":5,"rtypeid":3,"start_ts":1000,"end_ts":2000}"#,
            )
            .await;

        match outcome {
            Dispatch::Reply(frame) => {
                let json = serde_json::to_string(&frame).unwrap();
                assert!(json.contains("\"cmd\":\"RESP_SENSOR_STATS_ERROR\""));
            }
            other => panic!("Expected reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stats_returns_aggregates() {
        let gateway = Arc::new(MemoryGateway::new());
        for ts in [1100, 1200, 1300] {
            gateway
                .insert_reading(1, 5, Reading::new(ts, ts as f64, 3))
                .await
                .unwrap();
        }

        let (_registry, dispatcher, id, _rx) = setup(gateway).await;
        let outcome = dispatcher
            .dispatch(
                &id,
                r#"{"cmd":"RQST_SENSOR_STATS","groupid":1,"sensorid":5,"rtypeid":3,"start_ts":1000,"end_ts":2000}"#,
            )
            .await;

        match outcome {
            Dispatch::Reply(ServerFrame::RespSensorStats { stats }) => {
                assert_eq!(stats.count, 3);
                assert_eq!(stats.min, Some(1100.0));
                assert_eq!(stats.max, Some(1300.0));
            }
            other => panic!("Expected stats reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_download_returns_window() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway
            .insert_reading(1, 5, Reading::new(150, 1.0, 3))
            .await
            .unwrap();
        gateway
            .insert_reading(1, 5, Reading::new(950, 2.0, 4))
            .await
            .unwrap();

        let (_registry, dispatcher, id, _rx) = setup(gateway).await;
        let outcome = dispatcher
            .dispatch(
                &id,
                r#"{"cmd":"RQST_DOWNLOAD","groupid":1,"sensorid":5,"start_ts":"100","end_ts":"500"}"#,
            )
            .await;

        match outcome {
            Dispatch::Reply(ServerFrame::RespDownload { data }) => {
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].ts, 150);
            }
            other => panic!("Expected download reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_session_alive() {
        let (registry, dispatcher, id, _rx) = setup(Arc::new(MemoryGateway::new())).await;

        let outcome = dispatcher.dispatch(&id, "{{not json").await;
        match outcome {
            Dispatch::Reply(ServerFrame::RespError { .. }) => {}
            other => panic!("Expected protocol error, got {:?}", other),
        }

        // The same session can still issue valid commands.
        let outcome = dispatcher
            .dispatch(&id, r#"{"cmd":"RQST_JOIN","groupid":1,"sensorid":5}"#)
            .await;
        assert!(matches!(
            outcome,
            Dispatch::Reply(ServerFrame::RespJoin { join_status: true })
        ));
        assert!(registry.is_member(ROOM, &id).await);
    }

    #[tokio::test]
    async fn test_validation_failure_has_no_side_effects() {
        let (registry, dispatcher, id, _rx) = setup(Arc::new(MemoryGateway::new())).await;

        let outcome = dispatcher
            .dispatch(&id, r#"{"cmd":"RQST_JOIN","groupid":"x","sensorid":5}"#)
            .await;

        assert!(matches!(
            outcome,
            Dispatch::Reply(ServerFrame::RespError { .. })
        ));
        assert!(!registry.is_member(ROOM, &id).await);
    }
}
