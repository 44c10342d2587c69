//! Orchestrator - ties the queue, ledger, triggers and engine gateway together
//!
//! `submit` admits a record and waits on a completion signal; a background
//! drain loop is the only writer of `Running` and terminal states in the
//! queue. A second loop evaluates triggers on a fixed cadence.

use crate::config::OrchestratorConfig;
use crate::gateway::EngineGateway;
use crate::ledger::MetricsLedger;
use crate::queue::{BoundedWorkflowQueue, Location};
use crate::triggers::{ConditionEvaluator, NeverFire, TriggerRegistry};
use autoflow_types::{
    BatchRequest, BatchResult, CleanupReport, ExecutionFilter, ExecutionId, ExecutionRecord,
    ExecutionStatus, OrchestrationError, OrchestrationResult, QueueStatus, ServiceHealth,
    SubmitRequest, TriggerConfig, WorkflowKind, WorkflowMetrics,
};
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Handle to the orchestration core. Cheap to clone.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

struct Inner {
    config: OrchestratorConfig,
    gateway: Arc<dyn EngineGateway>,
    queue: Mutex<BoundedWorkflowQueue>,
    ledger: RwLock<MetricsLedger>,
    triggers: RwLock<TriggerRegistry>,
    /// Wakes the drain loop on admission and on freed slots
    queue_changed: Notify,
    /// Wakes every `submit` waiting on a terminal record
    completion: Notify,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl Orchestrator {
    /// Create an orchestrator whose triggers never fire past the rate limit
    pub fn new(config: OrchestratorConfig, gateway: Arc<dyn EngineGateway>) -> Self {
        Self::with_evaluator(config, gateway, Arc::new(NeverFire))
    }

    pub fn with_evaluator(
        config: OrchestratorConfig,
        gateway: Arc<dyn EngineGateway>,
        evaluator: Arc<dyn ConditionEvaluator>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let inner = Inner {
            queue: Mutex::new(BoundedWorkflowQueue::new(
                config.queue_capacity,
                config.max_concurrent,
            )),
            ledger: RwLock::new(MetricsLedger::new(config.max_executions_per_kind)),
            triggers: RwLock::new(TriggerRegistry::with_evaluator(
                config.rate_limit_window(),
                evaluator,
            )),
            queue_changed: Notify::new(),
            completion: Notify::new(),
            running: AtomicBool::new(false),
            shutdown,
            gateway,
            config,
        };

        Self {
            inner: Arc::new(inner),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Spawn the drain and trigger loops. Calling it twice is a no-op.
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.send_replace(false);

        let drain = tokio::spawn(drain_loop(Arc::clone(&self.inner)));
        let triggers = tokio::spawn(trigger_loop(Arc::clone(&self.inner)));
        self.tasks.lock().await.extend([drain, triggers]);

        tracing::info!(
            max_concurrent = self.inner.config.max_concurrent,
            queue_capacity = self.inner.config.queue_capacity,
            "Orchestrator started"
        );
    }

    /// Stop both loops and wait for them to exit.
    ///
    /// In-flight gateway calls are left to finish on their own.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.send_replace(true);
        self.inner.queue_changed.notify_one();
        self.inner.completion.notify_waiters();

        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Background task ended abnormally");
            }
        }

        tracing::info!("Orchestrator stopped");
    }

    // ── Submission ──────────────────────────────────────────────────

    /// Admit one execution and wait for it to become terminal.
    ///
    /// Queue-full, timeout and gateway failures come back as terminal
    /// records; only calling this on a stopped orchestrator is an error.
    pub async fn submit(&self, request: SubmitRequest) -> OrchestrationResult<ExecutionRecord> {
        self.inner.ensure_running()?;
        self.inner.submit(request).await
    }

    pub async fn submit_batch(&self, request: BatchRequest) -> OrchestrationResult<BatchResult> {
        self.inner.ensure_running()?;

        let batch_id = request.batch_id();
        let started_at = Utc::now();
        let delay = Duration::from_millis(request.delay_between_ms);

        tracing::info!(
            batch_id = %batch_id,
            total = request.kinds.len(),
            fail_fast = request.fail_fast,
            "Starting batch"
        );

        let results = if request.fail_fast {
            let mut results = Vec::with_capacity(request.kinds.len());
            for (index, kind) in request.kinds.iter().copied().enumerate() {
                if index > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                let record = self
                    .inner
                    .submit(request.member(index, kind, &batch_id))
                    .await?;
                let failed = record.status == ExecutionStatus::Failed;
                results.push(record);

                if failed {
                    tracing::warn!(
                        batch_id = %batch_id,
                        index,
                        kind = %kind,
                        "Batch stopped after failure"
                    );
                    break;
                }
            }
            results
        } else {
            let submissions = request.kinds.iter().copied().enumerate().map(|(index, kind)| {
                let member = request.member(index, kind, &batch_id);
                let stagger = delay.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
                let inner = &self.inner;
                async move {
                    if !stagger.is_zero() {
                        tokio::time::sleep(stagger).await;
                    }
                    inner.submit(member).await
                }
            });
            join_all(submissions)
                .await
                .into_iter()
                .collect::<OrchestrationResult<Vec<_>>>()?
        };

        let result = BatchResult::aggregate(batch_id, request.kinds.len(), results, started_at);
        tracing::info!(
            batch_id = %result.batch_id,
            succeeded = result.successful_workflows,
            failed = result.failed_workflows,
            "Batch finished"
        );
        Ok(result)
    }

    // ── Triggers ────────────────────────────────────────────────────

    /// Register or replace a trigger; returns the replaced config
    pub async fn add_trigger(
        &self,
        config: TriggerConfig,
    ) -> OrchestrationResult<Option<TriggerConfig>> {
        self.inner.triggers.write().await.upsert(config)
    }

    pub async fn remove_trigger(&self, name: &str) -> bool {
        self.inner.triggers.write().await.remove(name)
    }

    pub async fn list_triggers(&self) -> Vec<TriggerConfig> {
        self.inner.triggers.read().await.list()
    }

    /// Run one trigger evaluation pass; returns how many triggers fired
    pub async fn evaluate_triggers(&self) -> OrchestrationResult<usize> {
        self.inner.ensure_running()?;
        Ok(self.inner.evaluate_triggers().await)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Local lookup first, then ask the engine
    pub async fn get_execution(
        &self,
        id: &ExecutionId,
    ) -> OrchestrationResult<Option<ExecutionRecord>> {
        if let Some(record) = self.inner.find_local(id).await {
            return Ok(Some(record));
        }

        self.inner
            .gateway
            .fetch_execution(id.as_str())
            .await
            .map_err(|e| OrchestrationError::Gateway(e.to_string()))
    }

    /// Locally known records, newest first
    pub async fn list_executions(&self, filter: &ExecutionFilter) -> Vec<ExecutionRecord> {
        let mut records = self.inner.queue.lock().await.snapshot();
        let known: HashSet<ExecutionId> =
            records.iter().map(|r| r.execution_id.clone()).collect();

        {
            let ledger = self.inner.ledger.read().await;
            records.extend(
                ledger
                    .iter()
                    .filter(|r| !known.contains(&r.execution_id))
                    .cloned(),
            );
        }

        records.retain(|r| filter.matches(r));
        records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        records.truncate(filter.limit);
        records
    }

    /// Executions as the engine reports them
    pub async fn list_engine_executions(
        &self,
        filter: &ExecutionFilter,
    ) -> OrchestrationResult<Vec<ExecutionRecord>> {
        self.inner
            .gateway
            .list_executions(filter)
            .await
            .map_err(|e| OrchestrationError::Gateway(e.to_string()))
    }

    /// Ask the engine to stop an execution.
    ///
    /// Uses the engine-assigned id when the local record knows it. The
    /// local record is not touched; the drain loop reflects the outcome.
    pub async fn cancel(&self, id: &ExecutionId) -> OrchestrationResult<bool> {
        let engine_id = self
            .inner
            .find_local(id)
            .await
            .and_then(|r| r.engine_execution_id)
            .unwrap_or_else(|| id.to_string());

        let cancelled = self
            .inner
            .gateway
            .cancel(&engine_id)
            .await
            .map_err(|e| OrchestrationError::Gateway(e.to_string()))?;

        tracing::info!(execution_id = %id, engine_id = %engine_id, cancelled, "Cancel requested");
        Ok(cancelled)
    }

    pub async fn metrics(&self, kind: WorkflowKind) -> WorkflowMetrics {
        self.inner.ledger.read().await.metrics_for(kind)
    }

    pub async fn queue_status(&self) -> QueueStatus {
        let queue = self.inner.queue.lock().await;
        QueueStatus {
            queue_size: queue.size(),
            running_workflows: queue.running_count(),
            completed_workflows: queue.completed_count(),
            max_concurrent: queue.max_concurrent(),
            queue_capacity: queue.capacity(),
        }
    }

    /// Engine health plus local queue pressure
    pub async fn health(&self) -> ServiceHealth {
        let mut health = self.inner.gateway.health_check().await;
        let status = self.queue_status().await;
        health.queue_size = status.queue_size;
        health.running_workflows = status.running_workflows;
        health
    }

    // ── Maintenance ─────────────────────────────────────────────────

    /// Purge ledger and completed-map entries older than the retention window
    pub async fn cleanup(&self, retention_days: u32) -> CleanupReport {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
        let ledger_removed = self.inner.ledger.write().await.purge_older_than(cutoff);
        let completed_removed = self.inner.queue.lock().await.purge_completed_before(cutoff);

        // Waiters whose record was purged must observe its absence
        self.inner.completion.notify_waiters();

        tracing::info!(
            %cutoff,
            ledger_removed,
            completed_removed,
            "Cleaned up old executions"
        );

        CleanupReport {
            cutoff,
            ledger_removed,
            completed_removed,
        }
    }
}

impl Inner {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> OrchestrationResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(OrchestrationError::NotRunning)
        }
    }

    async fn submit(&self, request: SubmitRequest) -> OrchestrationResult<ExecutionRecord> {
        let wait = request
            .timeout()
            .unwrap_or_else(|| self.config.default_timeout());
        let mut record = ExecutionRecord::new(request.workflow_kind, request.payload)
            .with_correlation_id(request.correlation_id)
            .with_priority(request.priority);
        let id = record.execution_id.clone();

        if !self.queue.lock().await.admit(record.clone()) {
            record.fail(
                OrchestrationError::AdmissionRejected {
                    capacity: self.config.queue_capacity,
                }
                .to_string(),
            )?;
            return Ok(record);
        }
        self.queue_changed.notify_one();

        let finished = match tokio::time::timeout(wait, self.wait_for_completion(&id)).await {
            Ok(Some(done)) => done,
            Ok(None) | Err(_) => {
                tracing::warn!(
                    execution_id = %id,
                    timeout_secs = wait.as_secs(),
                    "Execution wait timed out"
                );
                record.time_out(wait)?;
                self.queue.lock().await.expire(record.clone());
                record
            }
        };

        self.ledger.write().await.record(finished.clone());
        Ok(finished)
    }

    /// Live queue state wins over the ledger copy
    async fn find_local(&self, id: &ExecutionId) -> Option<ExecutionRecord> {
        let live = self.queue.lock().await.locate(id).into_record();
        if live.is_some() {
            return live;
        }
        self.ledger.read().await.find(id).cloned()
    }

    /// Resolve once the record is completed; `None` if it disappeared
    async fn wait_for_completion(&self, id: &ExecutionId) -> Option<ExecutionRecord> {
        loop {
            let notified = self.completion.notified();
            let location = self.queue.lock().await.locate(id);
            match location {
                Location::Completed(record) => return Some(record),
                Location::Missing => return None,
                Location::Queued(_) | Location::Running(_) => notified.await,
            }
        }
    }

    /// Dequeue the head and move it into the running set under one lock
    async fn claim_next(&self) -> Option<ExecutionRecord> {
        let mut queue = self.queue.lock().await;
        while let Some(mut record) = queue.dequeue_if_slot_available() {
            match record.start() {
                Ok(()) => {
                    queue.mark_running(record.clone());
                    return Some(record);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Dropping unstartable record");
                    queue.mark_completed(record);
                    self.completion.notify_waiters();
                }
            }
        }
        None
    }

    /// Run one execution against the gateway and publish the outcome
    async fn execute(self: Arc<Self>, mut record: ExecutionRecord) {
        tracing::debug!(
            execution_id = %record.execution_id,
            kind = %record.workflow_kind,
            "Executing workflow"
        );

        let call = self.gateway.trigger(
            record.workflow_kind,
            &record.input,
            record.correlation_id.as_deref(),
        );
        let result = AssertUnwindSafe(call).catch_unwind().await;
        let applied = match result {
            Ok(Ok(outcome)) => record.complete(outcome),
            Ok(Err(e)) => record.fail(OrchestrationError::Gateway(e.to_string()).to_string()),
            Err(panic) => {
                record.fail(OrchestrationError::Gateway(panic_message(panic.as_ref())).to_string())
            }
        };
        if let Err(e) = applied {
            tracing::error!(execution_id = %record.execution_id, error = %e, "Failed to apply outcome");
        }

        tracing::info!(
            execution_id = %record.execution_id,
            kind = %record.workflow_kind,
            status = %record.status,
            duration_seconds = ?record.duration_seconds,
            "Execution finished"
        );

        let id = record.execution_id.clone();
        let status = record.status;
        if !self.queue.lock().await.mark_completed(record) {
            tracing::debug!(
                execution_id = %id,
                engine_status = %status,
                "Engine finished after the caller timed out; keeping the timed-out record"
            );
        }
        self.queue_changed.notify_one();
        self.completion.notify_waiters();
    }

    async fn evaluate_triggers(self: &Arc<Self>) -> usize {
        let now = Utc::now();
        let due: Vec<TriggerConfig> = {
            let triggers = self.triggers.read().await;
            let ledger = self.ledger.read().await;
            triggers
                .enabled()
                .into_iter()
                .filter(|config| match triggers.should_fire(config, now, &ledger) {
                    Ok(fire) => fire,
                    Err(e) => {
                        tracing::warn!(trigger = %config.name, error = %e, "Trigger evaluation failed");
                        false
                    }
                })
                .collect()
        };

        for config in &due {
            let request =
                SubmitRequest::new(config.workflow_kind, config.payload_template.clone())
                    .with_correlation_id(format!("auto_{}_{}", config.name, now.timestamp()));
            let inner = Arc::clone(self);
            let name = config.name.clone();

            tracing::info!(trigger = %name, kind = %config.workflow_kind, "Trigger fired");
            tokio::spawn(async move {
                match inner.submit(request).await {
                    Ok(record) => tracing::info!(
                        trigger = %name,
                        execution_id = %record.execution_id,
                        status = %record.status,
                        "Automated execution finished"
                    ),
                    Err(e) => tracing::error!(trigger = %name, error = %e, "Automated execution failed"),
                }
            });
        }

        due.len()
    }
}

async fn drain_loop(inner: Arc<Inner>) {
    let mut shutdown = inner.shutdown.subscribe();
    let idle = inner.config.idle_poll();
    tracing::debug!("Queue drain loop started");

    while inner.is_running() {
        match inner.claim_next().await {
            Some(record) => {
                tokio::spawn(Arc::clone(&inner).execute(record));
            }
            None => {
                tokio::select! {
                    _ = inner.queue_changed.notified() => {}
                    _ = tokio::time::sleep(idle) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }

    tracing::debug!("Queue drain loop stopped");
}

async fn trigger_loop(inner: Arc<Inner>) {
    let mut shutdown = inner.shutdown.subscribe();
    let period = inner.config.trigger_interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!("Trigger loop started");

    while inner.is_running() {
        tokio::select! {
            _ = ticker.tick() => {
                if !inner.is_running() {
                    break;
                }
                let fired = inner.evaluate_triggers().await;
                if fired > 0 {
                    tracing::debug!(fired, "Trigger evaluation pass");
                }
            }
            _ = shutdown.changed() => {}
        }
    }

    tracing::debug!("Trigger loop stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "gateway panicked".to_string()
    }
}
