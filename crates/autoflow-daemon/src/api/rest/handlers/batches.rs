//! Batch submission handler

use super::parse_kind;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use autoflow_types::{BatchRequest, BatchResult, Payload, WorkflowKind};
use axum::{extract::State, Json};
use serde::Deserialize;
use std::collections::HashMap;

/// Submit batch request
#[derive(Debug, Deserialize)]
pub struct SubmitBatchRequest {
    pub workflow_types: Vec<String>,
    #[serde(default)]
    pub shared_payload: Payload,
    /// Keyed by workflow type; unknown keys are ignored
    #[serde(default)]
    pub per_kind_payload: HashMap<String, Payload>,
    #[serde(default)]
    pub delay_between_ms: u64,
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl SubmitBatchRequest {
    fn into_batch(self) -> ApiResult<BatchRequest> {
        if self.workflow_types.is_empty() {
            return Err(ApiError::BadRequest("workflow_types must not be empty".into()));
        }

        let kinds = self
            .workflow_types
            .iter()
            .map(|raw| parse_kind(raw))
            .collect::<ApiResult<Vec<_>>>()?;

        let per_kind_payload: HashMap<WorkflowKind, Payload> = self
            .per_kind_payload
            .into_iter()
            .filter_map(|(raw, payload)| match raw.parse::<WorkflowKind>() {
                Ok(kind) => Some((kind, payload)),
                Err(_) => {
                    tracing::debug!(key = %raw, "Ignoring per-kind payload for unknown workflow");
                    None
                }
            })
            .collect();

        Ok(BatchRequest {
            kinds,
            shared_payload: self.shared_payload,
            per_kind_payload,
            delay_between_ms: self.delay_between_ms,
            fail_fast: self.fail_fast,
            correlation_id: self.correlation_id,
        })
    }
}

/// Submit a correlated batch of executions
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(request): Json<SubmitBatchRequest>,
) -> ApiResult<Json<BatchResult>> {
    let batch = request.into_batch()?;
    let result = state.orchestrator.submit_batch(batch).await?;
    Ok(Json(result))
}
