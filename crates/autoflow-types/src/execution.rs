//! Execution records and their lifecycle
//!
//! A record moves `Pending -> Running -> terminal`. `Pending` may also jump
//! straight to a terminal state when admission is rejected or the caller
//! stops waiting. Nothing leaves a terminal state.

use crate::{ExecutionId, OrchestrationError, OrchestrationResult, WorkflowKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque key-value data carried into and out of the engine
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Execution lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(rename = "timeout")]
    TimedOut,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Whether `self -> next` is a legal lifecycle step
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        match self {
            Self::Pending => !matches!(next, Self::Pending | Self::Completed),
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied execution priority (1-10).
///
/// Accepted and carried on the record, but admission order alone decides
/// dequeue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> OrchestrationResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(OrchestrationError::Configuration(format!(
                "Priority must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u8> for Priority {
    type Error = OrchestrationError;

    fn try_from(value: u8) -> OrchestrationResult<Self> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> u8 {
        priority.0
    }
}

/// Tracking record for one execution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique execution identifier
    pub execution_id: ExecutionId,

    /// Which automation to run
    pub workflow_kind: WorkflowKind,

    /// Current lifecycle status
    pub status: ExecutionStatus,

    /// Input data sent to the engine
    pub input: Payload,

    /// Output data returned by the engine (completed executions only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Payload>,

    /// Failure or timeout detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,

    /// Set once the record is terminal
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Wall-clock duration in seconds
    #[serde(default)]
    pub duration_seconds: Option<f64>,

    /// Identifier assigned by the engine, when it reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_execution_id: Option<String>,

    /// Groups related executions (batch membership, trigger origin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    /// Retries reported by the engine side; never incremented here
    #[serde(default)]
    pub retry_count: u32,
}

impl ExecutionRecord {
    /// Create a pending record with a fresh id
    pub fn new(workflow_kind: WorkflowKind, input: Payload) -> Self {
        Self {
            execution_id: ExecutionId::generate(workflow_kind),
            workflow_kind,
            status: ExecutionStatus::Pending,
            input,
            output: None,
            error_message: None,
            submitted_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            engine_execution_id: None,
            correlation_id: None,
            priority: Priority::default(),
            retry_count: 0,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move a pending record into `Running`
    pub fn start(&mut self) -> OrchestrationResult<()> {
        self.transition(ExecutionStatus::Running)
    }

    /// Apply the engine's outcome to a running record.
    ///
    /// A non-terminal outcome status is treated as a failure.
    pub fn complete(&mut self, outcome: ExecutionOutcome) -> OrchestrationResult<()> {
        if !outcome.status.is_terminal() {
            return self.fail(format!(
                "Engine reported non-terminal status: {}",
                outcome.status
            ));
        }

        self.transition(outcome.status)?;

        let completed_at = outcome.completed_at.unwrap_or_else(Utc::now);
        self.output = match outcome.status {
            ExecutionStatus::Completed => outcome.output,
            _ => None,
        };
        self.error_message = match outcome.status {
            ExecutionStatus::Failed | ExecutionStatus::TimedOut => outcome.error,
            _ => None,
        };
        self.engine_execution_id = outcome.engine_execution_id;
        self.completed_at = Some(completed_at);
        self.duration_seconds = outcome
            .duration_seconds
            .or_else(|| Some(seconds_between(self.submitted_at, completed_at)));
        Ok(())
    }

    /// Terminate the record as `Failed`
    pub fn fail(&mut self, message: impl Into<String>) -> OrchestrationResult<()> {
        self.transition(ExecutionStatus::Failed)?;
        self.error_message = Some(message.into());
        self.output = None;
        self.finish(Utc::now());
        Ok(())
    }

    /// Terminate the record as `TimedOut` after the caller gave up waiting
    pub fn time_out(&mut self, waited: Duration) -> OrchestrationResult<()> {
        self.transition(ExecutionStatus::TimedOut)?;
        self.error_message = Some(
            OrchestrationError::ExecutionTimeout {
                seconds: waited.as_secs(),
            }
            .to_string(),
        );
        self.finish(Utc::now());
        Ok(())
    }

    fn transition(&mut self, next: ExecutionStatus) -> OrchestrationResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(OrchestrationError::InvalidTransition {
                execution_id: self.execution_id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    fn finish(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at);
        self.duration_seconds = Some(seconds_between(self.submitted_at, at));
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds().max(0) as f64 / 1000.0
}

/// What the engine reports back for one trigger call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub output: Option<Payload>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub engine_execution_id: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

impl ExecutionOutcome {
    pub fn completed(output: Payload) -> Self {
        Self {
            status: ExecutionStatus::Completed,
            output: Some(output),
            error: None,
            engine_execution_id: None,
            completed_at: Some(Utc::now()),
            duration_seconds: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            output: None,
            error: Some(error.into()),
            engine_execution_id: None,
            completed_at: Some(Utc::now()),
            duration_seconds: None,
        }
    }

    pub fn with_engine_execution_id(mut self, id: impl Into<String>) -> Self {
        self.engine_execution_id = Some(id.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}

/// A single-execution submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub workflow_kind: WorkflowKind,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Overrides the orchestrator's default wait bound; zero is ignored
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl SubmitRequest {
    pub fn new(workflow_kind: WorkflowKind, payload: Payload) -> Self {
        Self {
            workflow_kind,
            payload,
            priority: Priority::default(),
            correlation_id: None,
            timeout_secs: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Wait bound override; zero means "use the default"
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Filter for execution listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionFilter {
    #[serde(default)]
    pub workflow_kind: Option<WorkflowKind>,
    #[serde(default)]
    pub status: Option<ExecutionStatus>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

impl Default for ExecutionFilter {
    fn default() -> Self {
        Self {
            workflow_kind: None,
            status: None,
            limit: default_limit(),
        }
    }
}

impl ExecutionFilter {
    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        self.workflow_kind.map_or(true, |k| k == record.workflow_kind)
            && self.status.map_or(true, |s| s == record.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending() -> ExecutionRecord {
        ExecutionRecord::new(WorkflowKind::CustomerAnalysis, Payload::new())
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut record = pending();
        record.start().unwrap();
        assert_eq!(record.status, ExecutionStatus::Running);

        let mut output = Payload::new();
        output.insert("workflowId".into(), json!("wf-1"));
        record
            .complete(ExecutionOutcome::completed(output).with_engine_execution_id("wf-1"))
            .unwrap();

        assert_eq!(record.status, ExecutionStatus::Completed);
        assert!(record.completed_at.is_some());
        assert!(record.duration_seconds.is_some());
        assert!(record.error_message.is_none());
        assert_eq!(record.engine_execution_id.as_deref(), Some("wf-1"));
    }

    #[test]
    fn test_terminal_state_is_final() {
        let mut record = pending();
        record.start().unwrap();
        record.fail("boom").unwrap();
        let snapshot = record.clone();

        assert!(record.start().is_err());
        assert!(record.fail("again").is_err());
        assert!(record.time_out(Duration::from_secs(1)).is_err());
        assert!(record
            .complete(ExecutionOutcome::completed(Payload::new()))
            .is_err());
        assert_eq!(record, snapshot);
    }

    #[test]
    fn test_pending_cannot_complete_without_running() {
        let mut record = pending();
        let err = record
            .complete(ExecutionOutcome::completed(Payload::new()))
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::InvalidTransition { .. }));
        assert_eq!(record.status, ExecutionStatus::Pending);
    }

    #[test]
    fn test_timeout_message_and_completion_time() {
        let mut record = pending();
        record.time_out(Duration::from_secs(2)).unwrap();
        assert_eq!(record.status, ExecutionStatus::TimedOut);
        assert!(record.error_message.as_deref().unwrap().contains("2 seconds"));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_non_terminal_outcome_becomes_failure() {
        let mut record = pending();
        record.start().unwrap();
        let mut outcome = ExecutionOutcome::completed(Payload::new());
        outcome.status = ExecutionStatus::Running;
        record.complete(outcome).unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert!(record.output.is_none());
    }

    #[test]
    fn test_failed_outcome_keeps_error_drops_output() {
        let mut record = pending();
        record.start().unwrap();
        record
            .complete(ExecutionOutcome::failed("HTTP 500: upstream"))
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("HTTP 500: upstream"));
        assert!(record.output.is_none());
    }

    #[test]
    fn test_priority_bounds() {
        assert!(Priority::new(0).is_err());
        assert!(Priority::new(11).is_err());
        assert_eq!(Priority::new(10).unwrap().value(), 10);
        assert_eq!(Priority::default().value(), 5);
        assert!(serde_json::from_value::<Priority>(json!(42)).is_err());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(ExecutionStatus::TimedOut).unwrap(),
            json!("timeout")
        );
        assert_eq!(
            serde_json::from_value::<ExecutionStatus>(json!("cancelled")).unwrap(),
            ExecutionStatus::Cancelled
        );
    }

    #[test]
    fn test_filter_matches() {
        let record = pending();
        let filter = ExecutionFilter {
            workflow_kind: Some(WorkflowKind::CustomerAnalysis),
            status: Some(ExecutionStatus::Pending),
            limit: 5,
        };
        assert!(filter.matches(&record));

        let other = ExecutionFilter {
            workflow_kind: Some(WorkflowKind::FollowUpSequences),
            ..Default::default()
        };
        assert!(!other.matches(&record));
    }

    #[test]
    fn test_zero_timeout_override_falls_back() {
        let mut request = SubmitRequest::new(WorkflowKind::CustomerAnalysis, Payload::new());
        assert_eq!(request.timeout(), None);

        request.timeout_secs = Some(0);
        assert_eq!(request.timeout(), None);

        let request = request.with_timeout(Duration::from_secs(45));
        assert_eq!(request.timeout(), Some(Duration::from_secs(45)));
    }
}
