//! Execution submission and query handlers

use super::parse_kind;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use autoflow_types::{
    ExecutionFilter, ExecutionId, ExecutionRecord, ExecutionStatus, Payload, Priority,
    SubmitRequest,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

/// Submit execution request
#[derive(Debug, Deserialize)]
pub struct SubmitExecutionRequest {
    pub workflow_type: String,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Overrides the configured wait bound
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl SubmitExecutionRequest {
    fn into_submit(self) -> ApiResult<SubmitRequest> {
        let kind = parse_kind(&self.workflow_type)?;
        let priority = match self.priority {
            Some(value) => Priority::new(value)?,
            None => Priority::default(),
        };

        let mut request = SubmitRequest::new(kind, self.payload).with_priority(priority);
        request.correlation_id = self.correlation_id;
        request.timeout_secs = self.timeout_secs;
        Ok(request)
    }
}

/// Largest page a listing may ask for
const MAX_LIST_LIMIT: usize = 100;

/// Execution listing query
#[derive(Debug, Default, Deserialize)]
pub struct ListExecutionsQuery {
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(default)]
    pub status: Option<ExecutionStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ListExecutionsQuery {
    fn into_filter(self) -> ApiResult<ExecutionFilter> {
        let mut filter = ExecutionFilter {
            workflow_kind: self.workflow_type.as_deref().map(parse_kind).transpose()?,
            status: self.status,
            ..Default::default()
        };
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIST_LIMIT).contains(&limit) {
                return Err(ApiError::Validation(format!(
                    "limit must be between 1 and {}, got {}",
                    MAX_LIST_LIMIT, limit
                )));
            }
            filter.limit = limit;
        }
        Ok(filter)
    }
}

/// Cancel execution response
#[derive(Debug, Serialize)]
pub struct CancelExecutionResponse {
    pub execution_id: String,
    pub cancelled: bool,
}

/// Submit an execution and wait for its terminal record
pub async fn submit_execution(
    State(state): State<AppState>,
    Json(request): Json<SubmitExecutionRequest>,
) -> ApiResult<Json<ExecutionRecord>> {
    let request = request.into_submit()?;
    let record = state.orchestrator.submit(request).await?;
    Ok(Json(record))
}

/// List locally known executions
pub async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<ListExecutionsQuery>,
) -> ApiResult<Json<Vec<ExecutionRecord>>> {
    let filter = query.into_filter()?;
    Ok(Json(state.orchestrator.list_executions(&filter).await))
}

/// List executions as the engine reports them
pub async fn list_engine_executions(
    State(state): State<AppState>,
    Query(query): Query<ListExecutionsQuery>,
) -> ApiResult<Json<Vec<ExecutionRecord>>> {
    let filter = query.into_filter()?;
    let records = state.orchestrator.list_engine_executions(&filter).await?;
    Ok(Json(records))
}

/// Get a specific execution
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExecutionRecord>> {
    let record = state
        .orchestrator
        .get_execution(&ExecutionId::new(id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Execution {} not found", id)))?;
    Ok(Json(record))
}

/// Ask the engine to stop an execution
pub async fn cancel_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancelExecutionResponse>> {
    let cancelled = state.orchestrator.cancel(&ExecutionId::new(id.clone())).await?;
    Ok(Json(CancelExecutionResponse {
        execution_id: id,
        cancelled,
    }))
}
