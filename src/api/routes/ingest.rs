//! Ingest Route
//!
//! Entry point for newly received sensor readings.
//!
//! - POST /api/v1/ingest - Single reading

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{IngestRequest, IngestResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::gateway::DataGateway;
use crate::reading::Reading;

/// POST /api/v1/ingest
///
/// Record one reading, then broadcast it to filter-matching viewers.
/// The broadcast happens only after the gateway accepted the reading.
pub async fn ingest_reading(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    validate_ingest_request(&req)?;

    let ts = req.ts.unwrap_or_else(|| Utc::now().timestamp());
    let reading = Reading::new(ts, req.val, req.rtypeid);

    state
        .gateway
        .insert_reading(req.groupid, req.sensorid, reading.clone())
        .await?;

    state
        .broadcaster
        .publish(req.groupid, req.sensorid, reading)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            status: "ok".to_string(),
            ts,
        }),
    ))
}

/// Validate an ingest request
fn validate_ingest_request(req: &IngestRequest) -> ApiResult<()> {
    if !req.val.is_finite() {
        return Err(ApiError::Validation(
            "Reading value must be a finite number".to_string(),
        ));
    }

    Ok(())
}
