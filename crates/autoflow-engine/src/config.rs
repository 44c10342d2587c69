//! Orchestrator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for queue, ledger and background loops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of admitted-but-not-running executions
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum number of executions running against the engine at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// How long `submit` waits for a terminal record
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Ledger history bound per workflow kind
    #[serde(default = "default_max_executions_per_kind")]
    pub max_executions_per_kind: usize,

    /// Drain loop sleep when nothing is dequeuable
    #[serde(default = "default_idle_poll_millis")]
    pub idle_poll_millis: u64,

    /// Trigger evaluation cadence
    #[serde(default = "default_trigger_interval_secs")]
    pub trigger_interval_secs: u64,

    /// Window used for per-trigger rate limiting
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_max_concurrent() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_executions_per_kind() -> usize {
    1000
}

fn default_idle_poll_millis() -> u64 {
    1000
}

fn default_trigger_interval_secs() -> u64 {
    60
}

fn default_rate_limit_window_secs() -> u64 {
    3600
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_concurrent: default_max_concurrent(),
            default_timeout_secs: default_timeout_secs(),
            max_executions_per_kind: default_max_executions_per_kind(),
            idle_poll_millis: default_idle_poll_millis(),
            trigger_interval_secs: default_trigger_interval_secs(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }
}

impl OrchestratorConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_millis)
    }

    pub fn trigger_interval(&self) -> Duration {
        Duration::from_secs(self.trigger_interval_secs)
    }

    pub fn rate_limit_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.rate_limit_window_secs as i64)
    }
}
