//! Autoflow Engine - workflow orchestration core
//!
//! Admission control, concurrency gating and execution tracking for
//! workflows that run on an external automation engine.
//!
//! ## Architecture
//!
//! ```text
//!  submit / submit_batch          trigger loop (every 60s)
//!          │                               │
//!          ▼                               ▼
//!  ┌──────────────────┐  admit   ┌──────────────────┐
//!  │   Orchestrator   │─────────▶│ BoundedWorkflow  │
//!  │  (wait on signal)│◀─notify──│      Queue       │
//!  └──────────────────┘          └────────┬─────────┘
//!          │ record                       │ dequeue (slot free)
//!          ▼                              ▼
//!  ┌──────────────────┐          ┌──────────────────┐
//!  │  MetricsLedger   │          │   drain loop     │──▶ EngineGateway
//!  └──────────────────┘          └──────────────────┘
//! ```
//!
//! The gateway is a trait; `autoflow-gateway` provides the HTTP webhook
//! implementation.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod gateway;
pub mod ledger;
pub mod orchestrator;
pub mod queue;
pub mod triggers;

pub use config::OrchestratorConfig;
pub use gateway::{EngineGateway, GatewayError, GatewayResult};
pub use ledger::MetricsLedger;
pub use orchestrator::Orchestrator;
pub use queue::{BoundedWorkflowQueue, Location};
pub use triggers::{ConditionEvaluator, NeverFire, TriggerRegistry};
