//! Engine and service health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall service health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthState {
    /// Combine the engine API probe with the webhook server probe
    pub fn from_probes(engine_ok: bool, webhook_ok: bool) -> Self {
        match (engine_ok, webhook_ok) {
            (true, true) => Self::Healthy,
            (false, false) => Self::Unhealthy,
            _ => Self::Degraded,
        }
    }
}

/// Health report for the engine plus local queue pressure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: HealthState,
    pub engine_connected: bool,
    pub webhook_server_connected: bool,
    /// Executions the engine reports as running
    #[serde(default)]
    pub active_executions: usize,
    /// Local admission queue length
    #[serde(default)]
    pub queue_size: usize,
    /// Locally running executions
    #[serde(default)]
    pub running_workflows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-endpoint probe results keyed by endpoint name
    #[serde(default)]
    pub endpoints: BTreeMap<String, bool>,
    pub checked_at: DateTime<Utc>,
}

impl ServiceHealth {
    pub fn from_probes(engine_ok: bool, webhook_ok: bool) -> Self {
        Self {
            status: HealthState::from_probes(engine_ok, webhook_ok),
            engine_connected: engine_ok,
            webhook_server_connected: webhook_ok,
            active_executions: 0,
            queue_size: 0,
            running_workflows: 0,
            error: None,
            endpoints: BTreeMap::new(),
            checked_at: Utc::now(),
        }
    }

    /// Report used when the health probe itself could not run
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::from_probes(false, false)
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}
