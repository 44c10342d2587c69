//! Error taxonomy for the orchestration layer
//!
//! Admission, timeout and gateway failures end up as terminal execution
//! records rather than propagated errors; their `Display` text is what lands
//! in `ExecutionRecord::error_message`.

use crate::{ExecutionId, ExecutionStatus};
use thiserror::Error;

/// Orchestration-level errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestrationError {
    /// The admission queue is at capacity
    #[error("Workflow queue is full")]
    AdmissionRejected { capacity: usize },

    /// The caller stopped waiting before the execution became terminal
    #[error("Workflow timed out after {seconds} seconds")]
    ExecutionTimeout { seconds: u64 },

    /// The workflow engine call failed
    #[error("Execution failed: {0}")]
    Gateway(String),

    /// Invalid input or trigger configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Attempted to move a record out of a terminal state, or skip a step
    #[error("Invalid transition for {execution_id}: {from} -> {to}")]
    InvalidTransition {
        execution_id: ExecutionId,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    /// Operation invoked before `start()` or after `stop()`
    #[error("Orchestrator is not running")]
    NotRunning,
}

/// Result type alias for orchestration operations
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
