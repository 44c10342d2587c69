//! Engine REST wire format

use autoflow_types::{ExecutionId, ExecutionRecord, ExecutionStatus, Payload, Priority, WorkflowKind};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// One execution as the engine API reports it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineExecution {
    pub id: String,
    #[serde(default)]
    pub finished: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct EngineExecutionList {
    #[serde(default)]
    pub data: Vec<EngineExecution>,
}

/// Map the engine's status vocabulary onto ours
pub fn map_status(status: Option<&str>, finished: Option<bool>) -> ExecutionStatus {
    match status {
        Some("success") => ExecutionStatus::Completed,
        Some("error") | Some("crashed") | Some("failed") => ExecutionStatus::Failed,
        Some("canceled") => ExecutionStatus::Cancelled,
        Some("running") | Some("new") | Some("waiting") => ExecutionStatus::Running,
        _ => match finished {
            Some(true) => ExecutionStatus::Completed,
            _ => ExecutionStatus::Running,
        },
    }
}

impl EngineExecution {
    fn data_object(&self) -> Option<&Payload> {
        self.data.as_ref().and_then(Value::as_object)
    }

    /// Workflow kind from the top-level field or the stamped payload
    pub fn workflow_kind(&self) -> Option<WorkflowKind> {
        self.workflow_type
            .as_deref()
            .or_else(|| self.data_object()?.get("workflowType")?.as_str())
            .and_then(|s| s.parse().ok())
    }

    /// `None` when the workflow kind cannot be resolved
    pub fn into_record(self) -> Option<ExecutionRecord> {
        let workflow_kind = self.workflow_kind()?;
        let status = map_status(self.status.as_deref(), self.finished);
        let input = self.data_object().cloned().unwrap_or_default();
        let correlation_id = input
            .get("correlationId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let submitted_at = self.started_at.unwrap_or_else(Utc::now);
        let completed_at = self.stopped_at.filter(|_| status.is_terminal());
        let duration_seconds = completed_at
            .map(|end| (end - submitted_at).num_milliseconds().max(0) as f64 / 1000.0);

        Some(ExecutionRecord {
            execution_id: ExecutionId::new(self.id.clone()),
            workflow_kind,
            status,
            input,
            output: None,
            error_message: None,
            submitted_at,
            completed_at,
            duration_seconds,
            engine_execution_id: Some(self.id),
            correlation_id,
            priority: Priority::default(),
            retry_count: 0,
        })
    }
}
