use crate::shipper::registry::{BatchRegistry, SourceSnapshot};
use crate::shipper::stats::StatsSnapshot;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Shared state for the status API
pub struct StatusState {
    pub version: String,
    pub start_time: Instant,
    pub registry: Arc<BatchRegistry>,
}

impl StatusState {
    pub fn new(registry: Arc<BatchRegistry>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            registry,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub limits: LimitsInfo,
    pub stats: StatsSnapshot,
    /// `null` while the registry is busy with a remote call
    pub sources: Option<Vec<SourceSnapshot>>,
}

#[derive(Debug, Serialize)]
pub struct LimitsInfo {
    pub max_events: usize,
    pub max_bytes: usize,
    pub event_overhead: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /status
pub async fn get_status(State(state): State<Arc<StatusState>>) -> Json<StatusResponse> {
    let stats = state.registry.stats().snapshot();
    let limits = state.registry.limits();
    let sources = state.registry.try_snapshot();

    Json(StatusResponse {
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        limits: LimitsInfo {
            max_events: limits.max_events,
            max_bytes: limits.max_bytes,
            event_overhead: limits.event_overhead,
        },
        stats,
        sources,
    })
}
