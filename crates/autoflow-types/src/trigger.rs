//! Automated trigger configuration

use crate::{OrchestrationError, OrchestrationResult, Payload, WorkflowKind};
use serde::{Deserialize, Serialize};

/// A named rule that may submit executions on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Unique trigger name (registry key)
    pub name: String,

    /// Workflow kind submitted when the trigger fires
    pub workflow_kind: WorkflowKind,

    /// Opaque condition descriptor handed to the condition evaluator
    #[serde(default)]
    pub conditions: Payload,

    /// Optional schedule descriptor (cron-like, opaque)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Hourly bound on executions of `workflow_kind`
    #[serde(default = "default_max_executions_per_hour")]
    pub max_executions_per_hour: u32,

    /// Payload submitted when the trigger fires
    #[serde(default)]
    pub payload_template: Payload,
}

fn default_enabled() -> bool {
    true
}

fn default_max_executions_per_hour() -> u32 {
    60
}

impl TriggerConfig {
    pub fn new(name: impl Into<String>, workflow_kind: WorkflowKind) -> Self {
        Self {
            name: name.into(),
            workflow_kind,
            conditions: Payload::new(),
            schedule: None,
            enabled: default_enabled(),
            max_executions_per_hour: default_max_executions_per_hour(),
            payload_template: Payload::new(),
        }
    }

    pub fn with_max_executions_per_hour(mut self, max: u32) -> Self {
        self.max_executions_per_hour = max;
        self
    }

    pub fn with_payload_template(mut self, template: Payload) -> Self {
        self.payload_template = template;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> OrchestrationResult<()> {
        if self.name.trim().is_empty() {
            return Err(OrchestrationError::Configuration(
                "Trigger name must not be empty".to_string(),
            ));
        }
        if self.max_executions_per_hour == 0 {
            return Err(OrchestrationError::Configuration(format!(
                "Trigger '{}' must allow at least one execution per hour",
                self.name
            )));
        }
        Ok(())
    }
}
