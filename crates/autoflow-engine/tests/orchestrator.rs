//! End-to-end behaviour of the orchestrator against a scripted gateway

use async_trait::async_trait;
use autoflow_engine::{
    ConditionEvaluator, EngineGateway, GatewayError, GatewayResult, Orchestrator,
    OrchestratorConfig,
};
use autoflow_types::{
    BatchRequest, ExecutionFilter, ExecutionId, ExecutionOutcome, ExecutionRecord,
    ExecutionStatus, HealthState, OrchestrationError, Payload, ServiceHealth, SubmitRequest,
    TriggerConfig, WorkflowKind,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct ScriptedGateway {
    delays: HashMap<WorkflowKind, Duration>,
    failing: HashSet<WorkflowKind>,
    panicking: HashSet<WorkflowKind>,
    erroring: HashSet<WorkflowKind>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: AtomicUsize,
    calls: Mutex<Vec<(WorkflowKind, Payload, Option<String>)>>,
    cancelled: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    fn delay(mut self, kind: WorkflowKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    fn fail(mut self, kind: WorkflowKind) -> Self {
        self.failing.insert(kind);
        self
    }

    fn panic_on(mut self, kind: WorkflowKind) -> Self {
        self.panicking.insert(kind);
        self
    }

    fn error_on(mut self, kind: WorkflowKind) -> Self {
        self.erroring.insert(kind);
        self
    }

    fn calls(&self) -> Vec<(WorkflowKind, Payload, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineGateway for ScriptedGateway {
    async fn trigger(
        &self,
        kind: WorkflowKind,
        payload: &Payload,
        correlation_id: Option<&str>,
    ) -> GatewayResult<ExecutionOutcome> {
        self.calls.lock().unwrap().push((
            kind,
            payload.clone(),
            correlation_id.map(str::to_string),
        ));
        let n = self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&kind)
            .copied()
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&kind) {
            panic!("engine exploded");
        }
        if self.erroring.contains(&kind) {
            return Err(GatewayError::Transport("connection refused".into()));
        }
        if self.failing.contains(&kind) {
            return Ok(ExecutionOutcome::failed("HTTP 500: workflow crashed"));
        }

        let mut output = Payload::new();
        output.insert("workflowId".into(), json!(format!("engine-{}", n)));
        Ok(ExecutionOutcome::completed(output)
            .with_engine_execution_id(format!("engine-{}", n))
            .with_duration(delay.as_secs_f64()))
    }

    async fn fetch_execution(&self, _id: &str) -> GatewayResult<Option<ExecutionRecord>> {
        Ok(None)
    }

    async fn list_executions(&self, _filter: &ExecutionFilter) -> GatewayResult<Vec<ExecutionRecord>> {
        Ok(Vec::new())
    }

    async fn cancel(&self, id: &str) -> GatewayResult<bool> {
        self.cancelled.lock().unwrap().push(id.to_string());
        Ok(true)
    }

    async fn health_check(&self) -> ServiceHealth {
        ServiceHealth::from_probes(true, false)
    }
}

fn config() -> OrchestratorConfig {
    OrchestratorConfig {
        trigger_interval_secs: 3600,
        ..Default::default()
    }
}

async fn started(
    config: OrchestratorConfig,
    gateway: ScriptedGateway,
) -> (Orchestrator, Arc<ScriptedGateway>) {
    let gateway = Arc::new(gateway);
    let orchestrator = Orchestrator::new(config, gateway.clone());
    orchestrator.start().await;
    (orchestrator, gateway)
}

fn payload(value: serde_json::Value) -> Payload {
    value.as_object().cloned().unwrap()
}

const A: WorkflowKind = WorkflowKind::CustomerAnalysis;
const B: WorkflowKind = WorkflowKind::FollowUpSequences;
const C: WorkflowKind = WorkflowKind::CrmLeadManagement;

// ── Single submission ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_submit_before_start_is_misuse() {
    let orchestrator = Orchestrator::new(config(), Arc::new(ScriptedGateway::default()));
    let err = orchestrator
        .submit(SubmitRequest::new(A, Payload::new()))
        .await
        .unwrap_err();
    assert_eq!(err, OrchestrationError::NotRunning);
}

#[tokio::test(start_paused = true)]
async fn test_submit_completes_and_records_metrics() {
    let (orchestrator, gateway) = started(config(), ScriptedGateway::default()).await;

    let record = orchestrator
        .submit(SubmitRequest::new(A, payload(json!({"customerId": "c-1"}))).with_correlation_id("req-1"))
        .await
        .unwrap();

    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.engine_execution_id.as_deref(), Some("engine-0"));
    assert!(record.completed_at.is_some());
    assert!(record.output.is_some());
    assert_eq!(gateway.calls()[0].2.as_deref(), Some("req-1"));

    let metrics = orchestrator.metrics(A).await;
    assert_eq!(metrics.total_executions, 1);
    assert_eq!(metrics.successful_executions, 1);

    let status = orchestrator.queue_status().await;
    assert_eq!(status.queue_size, 0);
    assert_eq!(status.running_workflows, 0);
    assert_eq!(status.completed_workflows, 1);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_capacity_overflow_rejects_exactly_one() {
    let config = OrchestratorConfig {
        queue_capacity: 2,
        max_concurrent: 0,
        ..config()
    };
    let (orchestrator, gateway) = started(config, ScriptedGateway::default()).await;

    let submissions = (0..3).map(|_| {
        orchestrator
            .submit(SubmitRequest::new(A, Payload::new()).with_timeout(Duration::from_secs(1)))
    });
    let results: Vec<_> = futures::future::join_all(submissions)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    let rejected: Vec<_> = results
        .iter()
        .filter(|r| r.error_message.as_deref() == Some("Workflow queue is full"))
        .collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].status, ExecutionStatus::Failed);
    assert_eq!(
        results
            .iter()
            .filter(|r| r.status == ExecutionStatus::TimedOut)
            .count(),
        2
    );
    assert!(gateway.calls().is_empty());
    // Timed-out copies leave the FIFO so nothing runs them later
    assert_eq!(orchestrator.queue_status().await.queue_size, 0);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_running_never_exceeds_max_concurrent() {
    let config = OrchestratorConfig {
        max_concurrent: 2,
        ..config()
    };
    let gateway = ScriptedGateway::default().delay(A, Duration::from_millis(100));
    let (orchestrator, gateway) = started(config, gateway).await;

    let sampler = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let mut peak = 0;
            for _ in 0..50 {
                peak = peak.max(orchestrator.queue_status().await.running_workflows);
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            peak
        })
    };

    let submissions = (0..8).map(|_| orchestrator.submit(SubmitRequest::new(A, Payload::new())));
    let results = futures::future::join_all(submissions).await;

    assert!(results
        .iter()
        .all(|r| r.as_ref().unwrap().status == ExecutionStatus::Completed));
    assert!(gateway.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert!(sampler.await.unwrap() <= 2);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_observational() {
    let gateway = ScriptedGateway::default().delay(A, Duration::from_secs(3));
    let (orchestrator, _gateway) = started(config(), gateway).await;

    let record = orchestrator
        .submit(SubmitRequest::new(A, Payload::new()).with_timeout(Duration::from_secs(2)))
        .await
        .unwrap();

    assert_eq!(record.status, ExecutionStatus::TimedOut);
    assert!(record.error_message.as_deref().unwrap().contains("2 seconds"));
    assert!(record.completed_at.is_some());

    // Reads agree with the returned record while the engine call is in flight
    let now = orchestrator
        .get_execution(&record.execution_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(now.status, ExecutionStatus::TimedOut);
    let listed = orchestrator.list_executions(&ExecutionFilter::default()).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ExecutionStatus::TimedOut);
    assert_eq!(orchestrator.queue_status().await.running_workflows, 1);

    // The engine call finishes later; the local record stays terminal
    tokio::time::sleep(Duration::from_secs(2)).await;
    let later = orchestrator
        .get_execution(&record.execution_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(later.status, ExecutionStatus::TimedOut);
    assert_eq!(later.error_message, record.error_message);
    assert_eq!(orchestrator.queue_status().await.running_workflows, 0);

    let metrics = orchestrator.metrics(A).await;
    assert_eq!(metrics.total_executions, 1);
    assert_eq!(metrics.successful_executions, 0);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_uses_default_wait() {
    let (orchestrator, _gateway) = started(config(), ScriptedGateway::default()).await;

    let mut request = SubmitRequest::new(A, Payload::new());
    request.timeout_secs = Some(0);
    let record = orchestrator.submit(request).await.unwrap();

    assert_eq!(record.status, ExecutionStatus::Completed);
    assert!(record.error_message.is_none());

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_gateway_errors_and_panics_become_failures() {
    let gateway = ScriptedGateway::default().error_on(A).panic_on(B);
    let (orchestrator, _gateway) = started(config(), gateway).await;

    let errored = orchestrator
        .submit(SubmitRequest::new(A, Payload::new()))
        .await
        .unwrap();
    assert_eq!(errored.status, ExecutionStatus::Failed);
    assert_eq!(
        errored.error_message.as_deref(),
        Some("Execution failed: HTTP error: connection refused")
    );

    let panicked = orchestrator
        .submit(SubmitRequest::new(B, Payload::new()))
        .await
        .unwrap();
    assert_eq!(panicked.status, ExecutionStatus::Failed);
    assert!(panicked
        .error_message
        .as_deref()
        .unwrap()
        .contains("engine exploded"));

    // The drain loop survives both
    let ok = orchestrator
        .submit(SubmitRequest::new(C, Payload::new()))
        .await
        .unwrap();
    assert_eq!(ok.status, ExecutionStatus::Completed);

    orchestrator.stop().await;
}

// ── Batches ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_fail_fast_batch_stops_after_first_failure() {
    let (orchestrator, gateway) = started(config(), ScriptedGateway::default().fail(A)).await;

    let mut request = BatchRequest::new(vec![A, B, C]);
    request.fail_fast = true;
    let result = orchestrator.submit_batch(request).await.unwrap();

    assert_eq!(result.total_workflows, 3);
    assert_eq!(result.execution_results.len(), 1);
    assert_eq!(result.execution_results[0].status, ExecutionStatus::Failed);
    assert_eq!(result.failed_workflows, 1);
    assert_eq!(result.successful_workflows, 0);
    assert_eq!(gateway.calls().len(), 1);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_batch_runs_every_member() {
    let (orchestrator, _gateway) = started(config(), ScriptedGateway::default().fail(A)).await;

    let result = orchestrator
        .submit_batch(BatchRequest::new(vec![A, B, C]))
        .await
        .unwrap();

    assert_eq!(result.execution_results.len(), 3);
    assert_eq!(result.failed_workflows, 1);
    assert_eq!(result.successful_workflows, 2);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_timeout_does_not_stop_fail_fast_batch() {
    let config = OrchestratorConfig {
        default_timeout_secs: 1,
        ..config()
    };
    let gateway = ScriptedGateway::default().delay(A, Duration::from_secs(5));
    let (orchestrator, _gateway) = started(config, gateway).await;

    let mut request = BatchRequest::new(vec![A, B, C]);
    request.fail_fast = true;
    let result = orchestrator.submit_batch(request).await.unwrap();

    let statuses: Vec<_> = result.execution_results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ExecutionStatus::TimedOut,
            ExecutionStatus::Completed,
            ExecutionStatus::Completed
        ]
    );
    assert_eq!(result.failed_workflows, 1);
    assert_eq!(result.successful_workflows, 2);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_batch_payload_merge_and_stamps() {
    let (orchestrator, gateway) = started(config(), ScriptedGateway::default()).await;

    let mut request = BatchRequest::new(vec![A, B]);
    request.fail_fast = true;
    request.correlation_id = Some("campaign-7".into());
    request.shared_payload = payload(json!({"customerId": "c-9", "tone": "formal"}));
    request
        .per_kind_payload
        .insert(B, payload(json!({"tone": "friendly"})));

    let result = orchestrator.submit_batch(request).await.unwrap();
    assert_eq!(result.batch_id.as_str(), "campaign-7");

    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);

    let (_, first, first_corr) = &calls[0];
    assert_eq!(first["tone"], json!("formal"));
    assert_eq!(first["batchIndex"], json!(0));
    assert_eq!(first_corr.as_deref(), Some("campaign-7"));

    let (_, second, _) = &calls[1];
    assert_eq!(second["tone"], json!("friendly"));
    assert_eq!(second["customerId"], json!("c-9"));
    assert_eq!(second["batchId"], json!("campaign-7"));
    assert_eq!(second["batchTotal"], json!(2));

    for record in &result.execution_results {
        assert_eq!(record.correlation_id.as_deref(), Some("campaign-7"));
    }

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_batch_delay_between_members() {
    let (orchestrator, _gateway) = started(config(), ScriptedGateway::default()).await;

    let mut request = BatchRequest::new(vec![A, B, C]);
    request.delay_between_ms = 500;
    let started_at = tokio::time::Instant::now();
    orchestrator.submit_batch(request).await.unwrap();

    assert!(started_at.elapsed() >= Duration::from_millis(1000));

    orchestrator.stop().await;
}

// ── Triggers ────────────────────────────────────────────────────────

fn always_fire() -> Arc<dyn ConditionEvaluator> {
    Arc::new(|_: &TriggerConfig, _: DateTime<Utc>| true)
}

#[tokio::test(start_paused = true)]
async fn test_trigger_fires_with_auto_correlation_id() {
    let gateway = Arc::new(ScriptedGateway::default());
    let orchestrator = Orchestrator::with_evaluator(config(), gateway.clone(), always_fire());
    orchestrator.start().await;

    orchestrator
        .add_trigger(
            TriggerConfig::new("nightly", C)
                .with_payload_template(payload(json!({"source": "scheduler"}))),
        )
        .await
        .unwrap();

    assert_eq!(orchestrator.evaluate_triggers().await.unwrap(), 1);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let calls = gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, C);
    assert_eq!(calls[0].1["source"], json!("scheduler"));
    assert!(calls[0].2.as_deref().unwrap().starts_with("auto_nightly_"));
    assert_eq!(orchestrator.metrics(C).await.total_executions, 1);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_trigger_does_not_fire() {
    let gateway = Arc::new(ScriptedGateway::default());
    let orchestrator = Orchestrator::with_evaluator(config(), gateway.clone(), always_fire());
    orchestrator.start().await;

    for _ in 0..3 {
        orchestrator
            .submit(SubmitRequest::new(C, Payload::new()))
            .await
            .unwrap();
    }
    orchestrator
        .add_trigger(TriggerConfig::new("leads", C).with_max_executions_per_hour(2))
        .await
        .unwrap();

    assert_eq!(orchestrator.evaluate_triggers().await.unwrap(), 0);
    assert_eq!(gateway.calls().len(), 3);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_default_evaluator_never_fires() {
    let (orchestrator, gateway) = started(config(), ScriptedGateway::default()).await;
    orchestrator
        .add_trigger(TriggerConfig::new("idle", A))
        .await
        .unwrap();

    assert_eq!(orchestrator.evaluate_triggers().await.unwrap(), 0);
    assert!(gateway.calls().is_empty());
    assert_eq!(orchestrator.list_triggers().await.len(), 1);
    assert!(orchestrator.remove_trigger("idle").await);
    assert!(orchestrator.list_triggers().await.is_empty());

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_trigger_loop_fires_on_cadence() {
    let gateway = Arc::new(ScriptedGateway::default());
    let config = OrchestratorConfig {
        trigger_interval_secs: 60,
        ..config()
    };
    let orchestrator = Orchestrator::with_evaluator(config, gateway.clone(), always_fire());
    orchestrator
        .add_trigger(TriggerConfig::new("tick", B).with_max_executions_per_hour(1))
        .await
        .unwrap();
    orchestrator.start().await;

    tokio::time::sleep(Duration::from_secs(185)).await;

    // The first pass fires, later passes are rate limited by the ledger
    assert_eq!(gateway.calls().len(), 1);

    orchestrator.stop().await;
}

// ── Queries and maintenance ─────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_list_get_and_cancel() {
    let (orchestrator, gateway) = started(config(), ScriptedGateway::default()).await;

    let first = orchestrator
        .submit(SubmitRequest::new(A, Payload::new()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = orchestrator
        .submit(SubmitRequest::new(B, Payload::new()))
        .await
        .unwrap();

    let all = orchestrator
        .list_executions(&ExecutionFilter::default())
        .await;
    assert_eq!(all.len(), 2);
    assert!(all[0].submitted_at >= all[1].submitted_at);

    let only_a = orchestrator
        .list_executions(&ExecutionFilter {
            workflow_kind: Some(A),
            ..Default::default()
        })
        .await;
    assert_eq!(only_a.len(), 1);
    assert_eq!(only_a[0].execution_id, first.execution_id);

    let found = orchestrator
        .get_execution(&second.execution_id)
        .await
        .unwrap();
    assert_eq!(found.map(|r| r.execution_id), Some(second.execution_id.clone()));
    assert!(orchestrator
        .get_execution(&ExecutionId::new("unknown"))
        .await
        .unwrap()
        .is_none());

    assert!(orchestrator.cancel(&second.execution_id).await.unwrap());
    assert!(orchestrator.cancel(&ExecutionId::new("raw-id")).await.unwrap());
    let cancelled = gateway.cancelled.lock().unwrap().clone();
    assert_eq!(
        cancelled,
        vec![second.engine_execution_id.clone().unwrap(), "raw-id".to_string()]
    );

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_purges_ledger_and_completed() {
    let (orchestrator, _gateway) = started(config(), ScriptedGateway::default()).await;
    orchestrator
        .submit(SubmitRequest::new(A, Payload::new()))
        .await
        .unwrap();

    let kept = orchestrator.cleanup(7).await;
    assert_eq!(kept.ledger_removed, 0);
    assert_eq!(kept.completed_removed, 0);

    // Zero-day retention moves the cutoff to now
    std::thread::sleep(Duration::from_millis(5));
    let report = orchestrator.cleanup(0).await;
    assert_eq!(report.ledger_removed, 1);
    assert_eq!(report.completed_removed, 1);
    assert_eq!(orchestrator.queue_status().await.completed_workflows, 0);
    assert_eq!(orchestrator.metrics(A).await.total_executions, 0);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_health_includes_queue_pressure() {
    let (orchestrator, _gateway) = started(config(), ScriptedGateway::default()).await;
    let health = orchestrator.health().await;
    assert_eq!(health.status, HealthState::Degraded);
    assert_eq!(health.queue_size, 0);
    assert_eq!(health.running_workflows, 0);
    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_and_stop_are_idempotent() {
    let (orchestrator, _gateway) = started(config(), ScriptedGateway::default()).await;
    orchestrator.start().await;
    assert!(orchestrator.is_running());

    orchestrator.stop().await;
    orchestrator.stop().await;
    assert!(!orchestrator.is_running());

    let err = orchestrator
        .submit_batch(BatchRequest::new(vec![A]))
        .await
        .unwrap_err();
    assert_eq!(err, OrchestrationError::NotRunning);

    orchestrator.start().await;
    let record = orchestrator
        .submit(SubmitRequest::new(A, Payload::new()))
        .await
        .unwrap();
    assert_eq!(record.status, ExecutionStatus::Completed);
    orchestrator.stop().await;
}
