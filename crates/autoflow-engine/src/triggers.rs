//! Named automated triggers gated by an hourly rate limit

use crate::ledger::MetricsLedger;
use autoflow_types::{OrchestrationResult, TriggerConfig};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Decides whether a trigger's conditions hold at `now`.
///
/// Runs only after the rate limit has allowed the trigger.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, config: &TriggerConfig, now: DateTime<Utc>) -> OrchestrationResult<bool>;
}

/// Default evaluator: conditions never hold
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverFire;

impl ConditionEvaluator for NeverFire {
    fn evaluate(&self, _config: &TriggerConfig, _now: DateTime<Utc>) -> OrchestrationResult<bool> {
        Ok(false)
    }
}

impl<F> ConditionEvaluator for F
where
    F: Fn(&TriggerConfig, DateTime<Utc>) -> bool + Send + Sync,
{
    fn evaluate(&self, config: &TriggerConfig, now: DateTime<Utc>) -> OrchestrationResult<bool> {
        Ok(self(config, now))
    }
}

/// Trigger configurations keyed by name
pub struct TriggerRegistry {
    configs: HashMap<String, TriggerConfig>,
    evaluator: Arc<dyn ConditionEvaluator>,
    window: Duration,
}

impl TriggerRegistry {
    pub fn new(window: Duration) -> Self {
        Self::with_evaluator(window, Arc::new(NeverFire))
    }

    pub fn with_evaluator(window: Duration, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self {
            configs: HashMap::new(),
            evaluator,
            window,
        }
    }

    /// Insert or replace by name; returns the replaced config
    pub fn upsert(&mut self, config: TriggerConfig) -> OrchestrationResult<Option<TriggerConfig>> {
        config.validate()?;
        tracing::info!(
            trigger = %config.name,
            kind = %config.workflow_kind,
            max_per_hour = config.max_executions_per_hour,
            "Registered trigger"
        );
        Ok(self.configs.insert(config.name.clone(), config))
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.configs.remove(name).is_some();
        if removed {
            tracing::info!(trigger = %name, "Removed trigger");
        }
        removed
    }

    /// All configs, sorted by name
    pub fn list(&self) -> Vec<TriggerConfig> {
        let mut configs: Vec<_> = self.configs.values().cloned().collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    pub fn enabled(&self) -> Vec<TriggerConfig> {
        self.list().into_iter().filter(|c| c.enabled).collect()
    }

    pub fn get(&self, name: &str) -> Option<&TriggerConfig> {
        self.configs.get(name)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Rate limit first, then the condition evaluator
    pub fn should_fire(
        &self,
        config: &TriggerConfig,
        now: DateTime<Utc>,
        ledger: &MetricsLedger,
    ) -> OrchestrationResult<bool> {
        if !config.enabled {
            return Ok(false);
        }

        let recent = ledger.count_since(config.workflow_kind, now - self.window);
        if recent >= config.max_executions_per_hour as usize {
            tracing::debug!(
                trigger = %config.name,
                recent,
                max_per_hour = config.max_executions_per_hour,
                "Trigger rate limited"
            );
            return Ok(false);
        }

        self.evaluator.evaluate(config, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_types::{ExecutionRecord, OrchestrationError, Payload, WorkflowKind};

    fn always() -> Arc<dyn ConditionEvaluator> {
        Arc::new(|_: &TriggerConfig, _: DateTime<Utc>| true)
    }

    fn ledger_with_recent(kind: WorkflowKind, count: usize) -> MetricsLedger {
        let mut ledger = MetricsLedger::new(100);
        for _ in 0..count {
            let mut record = ExecutionRecord::new(kind, Payload::new());
            record.fail("boom").unwrap();
            ledger.record(record);
        }
        ledger
    }

    #[test]
    fn test_rate_limit_blocks_even_when_conditions_hold() {
        let kind = WorkflowKind::CrmLeadManagement;
        let registry = TriggerRegistry::with_evaluator(Duration::hours(1), always());
        let config = TriggerConfig::new("leads", kind).with_max_executions_per_hour(2);

        let ledger = ledger_with_recent(kind, 3);
        assert!(!registry.should_fire(&config, Utc::now(), &ledger).unwrap());

        let ledger = ledger_with_recent(kind, 1);
        assert!(registry.should_fire(&config, Utc::now(), &ledger).unwrap());
    }

    #[test]
    fn test_old_entries_do_not_count() {
        let kind = WorkflowKind::CustomerAnalysis;
        let registry = TriggerRegistry::with_evaluator(Duration::hours(1), always());
        let config = TriggerConfig::new("daily", kind).with_max_executions_per_hour(1);
        let ledger = ledger_with_recent(kind, 1);

        let later = Utc::now() + Duration::hours(2);
        assert!(registry.should_fire(&config, later, &ledger).unwrap());
    }

    #[test]
    fn test_default_evaluator_never_fires() {
        let registry = TriggerRegistry::new(Duration::hours(1));
        let config = TriggerConfig::new("idle", WorkflowKind::FollowUpSequences);
        let ledger = MetricsLedger::new(10);
        assert!(!registry.should_fire(&config, Utc::now(), &ledger).unwrap());
    }

    #[test]
    fn test_disabled_trigger_never_fires() {
        let registry = TriggerRegistry::with_evaluator(Duration::hours(1), always());
        let config = TriggerConfig::new("off", WorkflowKind::FollowUpSequences).disabled();
        let ledger = MetricsLedger::new(10);
        assert!(!registry.should_fire(&config, Utc::now(), &ledger).unwrap());
    }

    #[test]
    fn test_upsert_remove_list() {
        let mut registry = TriggerRegistry::new(Duration::hours(1));
        let first = TriggerConfig::new("b", WorkflowKind::CustomerAnalysis);
        assert!(registry.upsert(first.clone()).unwrap().is_none());

        let replaced = registry
            .upsert(first.clone().with_max_executions_per_hour(5))
            .unwrap();
        assert_eq!(replaced, Some(first));
        assert_eq!(registry.get("b").unwrap().max_executions_per_hour, 5);

        registry
            .upsert(TriggerConfig::new("a", WorkflowKind::CrmLeadManagement).disabled())
            .unwrap();
        let names: Vec<_> = registry.list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.enabled().len(), 1);

        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_rejects_invalid() {
        let mut registry = TriggerRegistry::new(Duration::hours(1));
        let err = registry
            .upsert(TriggerConfig::new("", WorkflowKind::CustomerAnalysis))
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Configuration(_)));
        assert!(registry.is_empty());
    }
}
