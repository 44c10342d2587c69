//! Batch submission types

use crate::{BatchId, ExecutionRecord, ExecutionStatus, Payload, SubmitRequest, WorkflowKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A correlated group of executions sharing payload data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Kinds to run, in submission order
    pub kinds: Vec<WorkflowKind>,

    /// Merged into every member payload
    #[serde(default)]
    pub shared_payload: Payload,

    /// Per-kind payloads; keys here win over `shared_payload`
    #[serde(default)]
    pub per_kind_payload: HashMap<WorkflowKind, Payload>,

    /// Pause before each member after the first
    #[serde(default)]
    pub delay_between_ms: u64,

    /// Run sequentially and stop after the first failure
    #[serde(default)]
    pub fail_fast: bool,

    /// Becomes the batch id when present
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl BatchRequest {
    pub fn new(kinds: Vec<WorkflowKind>) -> Self {
        Self {
            kinds,
            ..Default::default()
        }
    }

    pub fn batch_id(&self) -> BatchId {
        self.correlation_id
            .as_ref()
            .map(BatchId::new)
            .unwrap_or_else(BatchId::generate)
    }

    /// Build the submission for the member at `index`
    pub fn member(&self, index: usize, kind: WorkflowKind, batch_id: &BatchId) -> SubmitRequest {
        let mut payload = self.shared_payload.clone();
        if let Some(specific) = self.per_kind_payload.get(&kind) {
            payload.extend(specific.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        payload.insert("batchId".into(), Value::from(batch_id.as_str()));
        payload.insert("batchIndex".into(), Value::from(index));
        payload.insert("batchTotal".into(), Value::from(self.kinds.len()));

        SubmitRequest::new(kind, payload).with_correlation_id(batch_id.as_str())
    }
}

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: BatchId,
    pub total_workflows: usize,
    pub successful_workflows: usize,
    /// Counts both `Failed` and `TimedOut` members
    pub failed_workflows: usize,
    pub execution_results: Vec<ExecutionRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_duration_seconds: f64,
}

impl BatchResult {
    pub fn aggregate(
        batch_id: BatchId,
        total_workflows: usize,
        execution_results: Vec<ExecutionRecord>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let completed_at = Utc::now();
        let successful_workflows = execution_results
            .iter()
            .filter(|r| r.status == ExecutionStatus::Completed)
            .count();
        let failed_workflows = execution_results
            .iter()
            .filter(|r| matches!(r.status, ExecutionStatus::Failed | ExecutionStatus::TimedOut))
            .count();

        Self {
            batch_id,
            total_workflows,
            successful_workflows,
            failed_workflows,
            execution_results,
            started_at,
            completed_at,
            total_duration_seconds: (completed_at - started_at).num_milliseconds().max(0) as f64
                / 1000.0,
        }
    }
}
