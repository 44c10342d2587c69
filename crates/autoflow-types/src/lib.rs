//! Autoflow Types - Core types for workflow execution orchestration
//!
//! Autoflow sits in front of an external workflow-automation engine reached
//! over HTTP webhooks. It admits executions into a bounded queue, runs them
//! under a concurrency cap, batches related executions together and keeps a
//! bounded history for metrics and trigger rate limiting.
//!
//! ## Key Concepts
//!
//! - **WorkflowKind**: The fixed set of automations the engine exposes
//! - **ExecutionRecord**: One attempt to run a workflow kind with a payload
//! - **Batch**: Correlated executions sharing payload data
//! - **Trigger**: A named, rate-limited rule that submits executions on its own
//! - **ServiceHealth**: Engine reachability plus local queue pressure

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod batch;
pub mod error;
pub mod execution;
pub mod health;
pub mod ids;
pub mod metrics;
pub mod trigger;
pub mod workflow;

// Re-export main types
pub use batch::{BatchRequest, BatchResult};
pub use error::{OrchestrationError, OrchestrationResult};
pub use execution::{
    ExecutionFilter, ExecutionOutcome, ExecutionRecord, ExecutionStatus, Payload, Priority,
    SubmitRequest,
};
pub use health::{HealthState, ServiceHealth};
pub use ids::{BatchId, ExecutionId};
pub use metrics::{CleanupReport, QueueStatus, WorkflowMetrics};
pub use trigger::TriggerConfig;
pub use workflow::WorkflowKind;
