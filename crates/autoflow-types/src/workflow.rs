//! Workflow kinds exposed by the automation engine

use crate::{OrchestrationError, OrchestrationResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed enumeration of automations this service can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    CustomerAnalysis,
    FollowUpSequences,
    CrmLeadManagement,
    PhotoAnalysisProcessing,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 4] = [
        WorkflowKind::CustomerAnalysis,
        WorkflowKind::FollowUpSequences,
        WorkflowKind::CrmLeadManagement,
        WorkflowKind::PhotoAnalysisProcessing,
    ];

    /// Wire name, also used as the webhook path segment
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::CustomerAnalysis => "customer-analysis",
            WorkflowKind::FollowUpSequences => "follow-up-sequences",
            WorkflowKind::CrmLeadManagement => "crm-lead-management",
            WorkflowKind::PhotoAnalysisProcessing => "photo-analysis-processing",
        }
    }

    /// Human-readable workflow name
    pub fn display_name(&self) -> &'static str {
        match self {
            WorkflowKind::CustomerAnalysis => "Customer Analysis & Email Workflow",
            WorkflowKind::FollowUpSequences => "Follow-up Sequences Workflow",
            WorkflowKind::CrmLeadManagement => "CRM Lead Management Workflow",
            WorkflowKind::PhotoAnalysisProcessing => "Photo Analysis Processing Workflow",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> OrchestrationResult<Self> {
        WorkflowKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| OrchestrationError::Configuration(format!("Unknown workflow kind: {}", s)))
    }
}
