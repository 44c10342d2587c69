//! Bounded admission queue with a global concurrency-slot ledger
//!
//! Admission and running are separate gates: bursts fill the FIFO while the
//! drain loop only pulls from it when a slot is free. The structure is plain
//! data; the orchestrator serializes access behind a single mutex so that
//! dequeue and the running-set insert happen in one critical section.

use autoflow_types::{ExecutionId, ExecutionRecord};
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

/// Where a record currently lives
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Queued(ExecutionRecord),
    Running(ExecutionRecord),
    Completed(ExecutionRecord),
    Missing,
}

impl Location {
    pub fn into_record(self) -> Option<ExecutionRecord> {
        match self {
            Location::Queued(r) | Location::Running(r) | Location::Completed(r) => Some(r),
            Location::Missing => None,
        }
    }
}

/// FIFO admission queue plus running and completed sets
#[derive(Debug)]
pub struct BoundedWorkflowQueue {
    pending: VecDeque<ExecutionRecord>,
    running: HashMap<ExecutionId, ExecutionRecord>,
    completed: HashMap<ExecutionId, ExecutionRecord>,
    capacity: usize,
    max_concurrent: usize,
}

impl BoundedWorkflowQueue {
    pub fn new(capacity: usize, max_concurrent: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            running: HashMap::new(),
            completed: HashMap::new(),
            capacity,
            max_concurrent,
        }
    }

    /// Append to the FIFO. Returns `false` without mutating when full.
    pub fn admit(&mut self, record: ExecutionRecord) -> bool {
        if self.pending.len() >= self.capacity {
            tracing::warn!(
                execution_id = %record.execution_id,
                capacity = self.capacity,
                "Workflow queue is full"
            );
            return false;
        }
        tracing::debug!(
            execution_id = %record.execution_id,
            kind = %record.workflow_kind,
            "Admitted execution"
        );
        self.pending.push_back(record);
        true
    }

    /// Pop the head only while the running count is below the cap
    pub fn dequeue_if_slot_available(&mut self) -> Option<ExecutionRecord> {
        if self.running.len() >= self.max_concurrent {
            return None;
        }
        self.pending.pop_front()
    }

    pub fn mark_running(&mut self, record: ExecutionRecord) {
        self.running.insert(record.execution_id.clone(), record);
    }

    /// Leave the running set and store the terminal record.
    ///
    /// An entry already in the completed map is kept; returns `false` when
    /// `record` was discarded for that reason.
    pub fn mark_completed(&mut self, record: ExecutionRecord) -> bool {
        self.running.remove(&record.execution_id);
        match self.completed.entry(record.execution_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Store a record the caller stopped waiting for.
    ///
    /// A still-queued copy is dropped from the FIFO. A running copy keeps its
    /// slot until the engine call returns, but reads see `record` from now on.
    pub fn expire(&mut self, record: ExecutionRecord) {
        let id = record.execution_id.clone();
        self.pending.retain(|r| r.execution_id != id);
        self.completed.insert(id, record);
    }

    pub fn locate(&self, id: &ExecutionId) -> Location {
        if let Some(record) = self.completed.get(id) {
            return Location::Completed(record.clone());
        }
        if let Some(record) = self.running.get(id) {
            return Location::Running(record.clone());
        }
        self.pending
            .iter()
            .find(|r| &r.execution_id == id)
            .map(|r| Location::Queued(r.clone()))
            .unwrap_or(Location::Missing)
    }

    pub fn completed(&self, id: &ExecutionId) -> Option<&ExecutionRecord> {
        self.completed.get(id)
    }

    /// Copies of every record held, in no particular order
    pub fn snapshot(&self) -> Vec<ExecutionRecord> {
        self.pending
            .iter()
            .chain(
                self.running
                    .values()
                    .filter(|r| !self.completed.contains_key(&r.execution_id)),
            )
            .chain(self.completed.values())
            .cloned()
            .collect()
    }

    /// Drop completed records submitted before `cutoff`; returns how many.
    /// Expired records whose engine call is still running are kept.
    pub fn purge_completed_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.completed.len();
        let running = &self.running;
        self.completed
            .retain(|id, r| r.submitted_at >= cutoff || running.contains_key(id));
        before - self.completed.len()
    }

    pub fn size(&self) -> usize {
        self.pending.len()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
