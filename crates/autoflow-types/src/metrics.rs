//! Aggregate statistics and queue observability snapshots

use crate::WorkflowKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-kind statistics derived from the metrics ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    pub workflow_kind: WorkflowKind,
    pub total_executions: usize,
    pub successful_executions: usize,
    /// `Failed` records only; timeouts are neither success nor failure here
    pub failed_executions: usize,
    /// Mean over `Completed` records with a known duration
    pub average_duration_seconds: f64,
    /// `successful / total * 100`, zero for an empty history
    pub success_rate: f64,
    pub last_execution: Option<DateTime<Utc>>,
}

impl WorkflowMetrics {
    pub fn empty(workflow_kind: WorkflowKind) -> Self {
        Self {
            workflow_kind,
            total_executions: 0,
            successful_executions: 0,
            failed_executions: 0,
            average_duration_seconds: 0.0,
            success_rate: 0.0,
            last_execution: None,
        }
    }
}

/// Point-in-time view of the admission queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_size: usize,
    pub running_workflows: usize,
    pub completed_workflows: usize,
    pub max_concurrent: usize,
    pub queue_capacity: usize,
}

/// What a retention sweep removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub cutoff: DateTime<Utc>,
    pub ledger_removed: usize,
    pub completed_removed: usize,
}
