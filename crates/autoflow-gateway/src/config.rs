//! Gateway configuration

use autoflow_types::WorkflowKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Where the workflow engine and its webhook proxy live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Engine REST API base URL
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    /// Webhook proxy base URL
    #[serde(default = "default_webhook_server_url")]
    pub webhook_server_url: String,

    /// Sent as a Bearer token when present
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Webhook path segment keyed by workflow kind wire name
    #[serde(default = "default_webhook_paths")]
    pub webhook_paths: BTreeMap<String, String>,

    /// Extra health probes, name to URL
    #[serde(default)]
    pub probe_endpoints: BTreeMap<String, String>,
}

fn default_engine_url() -> String {
    "http://localhost:5678".to_string()
}

fn default_webhook_server_url() -> String {
    "http://localhost:3003".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_webhook_paths() -> BTreeMap<String, String> {
    WorkflowKind::ALL
        .into_iter()
        .map(|kind| (kind.as_str().to_string(), kind.as_str().to_string()))
        .collect()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            engine_url: default_engine_url(),
            webhook_server_url: default_webhook_server_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            webhook_paths: default_webhook_paths(),
            probe_endpoints: BTreeMap::new(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Path segment for `kind`, falling back to its wire name
    pub fn webhook_path(&self, kind: WorkflowKind) -> &str {
        self.webhook_paths
            .get(kind.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| kind.as_str())
    }
}
