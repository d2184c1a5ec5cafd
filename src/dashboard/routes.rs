//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::config::SensorConfig;
use crate::engine::coordinator::Coordinator;
use crate::sensor::SensorState;
use crate::types::FetchResult;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub coordinator: Arc<Coordinator>,
    pub sensor: SensorConfig,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(coordinator: Arc<Coordinator>, sensor: SensorConfig) -> Self {
        Self {
            coordinator,
            sensor,
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub last_update_success: bool,
    pub restored: bool,
    pub refresh_count: u64,
    pub failure_count: u64,
    pub last_success_at: Option<String>,
    pub last_failure_at: Option<String>,
    pub last_error: Option<String>,
    pub uptime_secs: i64,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/sensor
pub async fn get_sensor(State(state): State<AppState>) -> Json<SensorState> {
    let snapshot = state.coordinator.snapshot().await;
    Json(SensorState::from_snapshot(&state.sensor, &snapshot))
}

/// GET /api/reading
pub async fn get_reading(
    State(state): State<AppState>,
) -> Result<Json<FetchResult>, StatusCode> {
    state
        .coordinator
        .latest()
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snap = state.coordinator.snapshot().await;
    Json(StatusResponse {
        last_update_success: snap.last_update_success,
        restored: snap.restored,
        refresh_count: snap.refresh_count,
        failure_count: snap.failure_count,
        last_success_at: snap.last_success_at.map(|t| t.to_rfc3339()),
        last_failure_at: snap.last_failure_at.map(|t| t.to_rfc3339()),
        last_error: snap.last_error,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
