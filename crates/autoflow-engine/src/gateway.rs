//! Contract for the external workflow engine

use async_trait::async_trait;
use autoflow_types::{ExecutionFilter, ExecutionOutcome, ExecutionRecord, Payload, ServiceHealth, WorkflowKind};
use thiserror::Error;

/// Errors surfaced by an engine gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid engine response: {0}")]
    Decode(String),

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// What the orchestrator needs from the workflow engine.
///
/// Implementations own the wire format; the orchestrator only sees
/// outcomes, records and health reports.
#[async_trait]
pub trait EngineGateway: Send + Sync {
    /// Start one execution and wait for the engine's answer
    async fn trigger(
        &self,
        kind: WorkflowKind,
        payload: &Payload,
        correlation_id: Option<&str>,
    ) -> GatewayResult<ExecutionOutcome>;

    /// Look up an execution by the engine's id; `None` when unknown
    async fn fetch_execution(&self, engine_execution_id: &str) -> GatewayResult<Option<ExecutionRecord>>;

    async fn list_executions(&self, filter: &ExecutionFilter) -> GatewayResult<Vec<ExecutionRecord>>;

    /// Ask the engine to stop an execution; `true` when it accepted
    async fn cancel(&self, engine_execution_id: &str) -> GatewayResult<bool>;

    async fn health_check(&self) -> ServiceHealth;
}
