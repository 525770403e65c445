//! In-Memory Gateway
//!
//! Reference [`DataGateway`] backed by a map of per-sensor reading logs.
//! Used by the standalone server and throughout the test suite.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DataGateway, GatewayError, SensorStats};
use crate::reading::Reading;

/// In-memory reading store keyed by (group id, sensor id).
#[derive(Default)]
pub struct MemoryGateway {
    readings: RwLock<HashMap<(i64, i64), Vec<Reading>>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total readings held across all sensors.
    pub async fn len(&self) -> usize {
        self.readings.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DataGateway for MemoryGateway {
    async fn readings(
        &self,
        sensor_id: i64,
        group_id: i64,
        rtypeid: i64,
        limit: usize,
    ) -> Result<Vec<Reading>, GatewayError> {
        let store = self.readings.read().await;
        let mut matched: Vec<Reading> = store
            .get(&(group_id, sensor_id))
            .map(|log| {
                log.iter()
                    .filter(|r| r.rtypeid == rtypeid)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matched.sort_by(|a, b| b.ts.cmp(&a.ts));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn sensor_stats(
        &self,
        sensor_id: i64,
        group_id: i64,
        rtypeid: i64,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<SensorStats, GatewayError> {
        let store = self.readings.read().await;
        let values: Vec<f64> = store
            .get(&(group_id, sensor_id))
            .map(|log| {
                log.iter()
                    .filter(|r| r.rtypeid == rtypeid && r.ts >= start_ts && r.ts <= end_ts)
                    .map(|r| r.val)
                    .collect()
            })
            .unwrap_or_default();

        if values.is_empty() {
            return Ok(SensorStats {
                count: 0,
                min: None,
                max: None,
                avg: None,
            });
        }

        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;

        Ok(SensorStats {
            count: values.len(),
            min: Some(min),
            max: Some(max),
            avg: Some(avg),
        })
    }

    async fn readings_by_period(
        &self,
        sensor_id: i64,
        group_id: i64,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<Reading>, GatewayError> {
        let store = self.readings.read().await;
        let mut matched: Vec<Reading> = store
            .get(&(group_id, sensor_id))
            .map(|log| {
                log.iter()
                    .filter(|r| r.ts >= start_ts && r.ts <= end_ts)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matched.sort_by(|a, b| a.ts.cmp(&b.ts));
        Ok(matched)
    }

    async fn insert_reading(
        &self,
        group_id: i64,
        sensor_id: i64,
        reading: Reading,
    ) -> Result<(), GatewayError> {
        let mut store = self.readings.write().await;
        store.entry((group_id, sensor_id)).or_default().push(reading);
        Ok(())
    }
}
