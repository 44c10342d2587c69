//! Bounded per-kind history of terminal executions

use autoflow_types::{ExecutionId, ExecutionRecord, ExecutionStatus, WorkflowKind, WorkflowMetrics};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Terminal execution history keyed by workflow kind
#[derive(Debug)]
pub struct MetricsLedger {
    history: HashMap<WorkflowKind, Vec<ExecutionRecord>>,
    max_per_kind: usize,
}

impl MetricsLedger {
    pub fn new(max_per_kind: usize) -> Self {
        Self {
            history: HashMap::new(),
            max_per_kind,
        }
    }

    /// Append a terminal record, keeping only the most recent entries by
    /// submission time once the per-kind bound is exceeded.
    pub fn record(&mut self, execution: ExecutionRecord) {
        let entries = self.history.entry(execution.workflow_kind).or_default();
        entries.push(execution);

        if entries.len() > self.max_per_kind {
            entries.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
            entries.truncate(self.max_per_kind);
        }
    }

    pub fn metrics_for(&self, kind: WorkflowKind) -> WorkflowMetrics {
        let Some(entries) = self.history.get(&kind).filter(|e| !e.is_empty()) else {
            return WorkflowMetrics::empty(kind);
        };

        let total = entries.len();
        let succeeded = entries
            .iter()
            .filter(|e| e.status == ExecutionStatus::Completed)
            .count();
        let failed = entries
            .iter()
            .filter(|e| e.status == ExecutionStatus::Failed)
            .count();

        let durations: Vec<f64> = entries
            .iter()
            .filter(|e| e.status == ExecutionStatus::Completed)
            .filter_map(|e| e.duration_seconds)
            .collect();
        let average_duration_seconds = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        WorkflowMetrics {
            workflow_kind: kind,
            total_executions: total,
            successful_executions: succeeded,
            failed_executions: failed,
            average_duration_seconds,
            success_rate: succeeded as f64 / total as f64 * 100.0,
            last_execution: entries.iter().map(|e| e.submitted_at).max(),
        }
    }

    /// Drop entries submitted before `cutoff` across all kinds
    pub fn purge_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for entries in self.history.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.submitted_at >= cutoff);
            removed += before - entries.len();
        }
        self.history.retain(|_, entries| !entries.is_empty());
        removed
    }

    /// Entries for `kind` submitted at or after `since`
    pub fn count_since(&self, kind: WorkflowKind, since: DateTime<Utc>) -> usize {
        self.history
            .get(&kind)
            .map(|entries| entries.iter().filter(|e| e.submitted_at >= since).count())
            .unwrap_or(0)
    }

    pub fn len_for(&self, kind: WorkflowKind) -> usize {
        self.history.get(&kind).map_or(0, Vec::len)
    }

    pub fn entries_for(&self, kind: WorkflowKind) -> &[ExecutionRecord] {
        self.history.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, id: &ExecutionId) -> Option<&ExecutionRecord> {
        self.iter().find(|e| &e.execution_id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.history.values().flatten()
    }
}
