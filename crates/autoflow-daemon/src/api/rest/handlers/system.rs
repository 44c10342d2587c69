//! Health, queue, metrics and maintenance handlers

use super::parse_kind;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use autoflow_types::{CleanupReport, QueueStatus, ServiceHealth, WorkflowMetrics};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub orchestrator_running: bool,
}

/// Daemon liveness; does not touch the engine
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let running = state.orchestrator.is_running();
    Json(HealthCheckResponse {
        status: if running { "healthy" } else { "stopped" }.to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        orchestrator_running: running,
    })
}

/// Engine and webhook reachability plus local queue pressure
pub async fn engine_health(State(state): State<AppState>) -> Json<ServiceHealth> {
    Json(state.orchestrator.health().await)
}

/// Admission queue snapshot
pub async fn queue_status(State(state): State<AppState>) -> Json<QueueStatus> {
    Json(state.orchestrator.queue_status().await)
}

/// Per-kind execution statistics
pub async fn workflow_metrics(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<WorkflowMetrics>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.orchestrator.metrics(kind).await))
}

/// Trigger evaluation response
#[derive(Debug, Serialize)]
pub struct EvaluateTriggersResponse {
    pub fired: usize,
}

/// Run one trigger evaluation pass now
pub async fn evaluate_triggers(
    State(state): State<AppState>,
) -> ApiResult<Json<EvaluateTriggersResponse>> {
    let fired = state.orchestrator.evaluate_triggers().await?;
    Ok(Json(EvaluateTriggersResponse { fired }))
}

/// Cleanup query
#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    #[serde(default)]
    pub retention_days: Option<u32>,
}

/// Purge history older than the retention window
pub async fn cleanup(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Json<CleanupReport> {
    let days = query.retention_days.unwrap_or(state.retention_days);
    Json(state.orchestrator.cleanup(days).await)
}
