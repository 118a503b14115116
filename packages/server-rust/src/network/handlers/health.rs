//! Health, liveness, readiness, and status endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use eventrelay_core::messages::HealthReply;
use serde_json::json;

use super::AppState;
use crate::network::HealthState;

/// `GET /health`: always `{"status":"ok"}` while the process answers.
pub async fn health_handler() -> Json<HealthReply> {
    Json(HealthReply::ok())
}

/// `GET /health/live`: liveness probe, always 200.
///
/// Does not look at lifecycle state; a failed liveness probe restarts the
/// process.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// `GET /health/ready`: 200 when ready, 503 while starting or draining.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// `GET /health/status`: lifecycle details for operators. Always 200; the
/// `state` field tells whether the process is serving or draining.
pub async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "state": state.shutdown.health_state().as_str(),
        "in_flight": state.shutdown.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "delegation_enabled": state.dispatcher.routing().delegation_enabled,
    }))
}
