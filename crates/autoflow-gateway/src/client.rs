//! HTTP client for the workflow engine and its webhook proxy

use crate::config::GatewayConfig;
use crate::wire::{EngineExecution, EngineExecutionList};
use async_trait::async_trait;
use autoflow_engine::{EngineGateway, GatewayError, GatewayResult};
use autoflow_types::{
    ExecutionFilter, ExecutionOutcome, ExecutionRecord, ExecutionStatus, Payload, ServiceHealth,
    WorkflowKind,
};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

/// Value stamped into every triggered payload's `source` field
pub const PAYLOAD_SOURCE: &str = "autoflow";

/// Engine gateway backed by HTTP webhooks and the engine REST API
pub struct WebhookGateway {
    client: Client,
    engine_url: String,
    webhook_server_url: String,
    config: GatewayConfig,
}

impl WebhookGateway {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| GatewayError::Transport(format!("invalid API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            engine_url: config.engine_url.trim_end_matches('/').to_string(),
            webhook_server_url: config.webhook_server_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn engine_url(&self) -> &str {
        &self.engine_url
    }

    pub fn webhook_server_url(&self) -> &str {
        &self.webhook_server_url
    }

    fn webhook_endpoint(&self, kind: WorkflowKind) -> String {
        format!(
            "{}/api/webhooks/{}",
            self.webhook_server_url,
            self.config.webhook_path(kind)
        )
    }

    fn engine_endpoint(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.engine_url, path)
    }

    /// Add the tracking fields the engine workflows expect
    fn enrich(kind: WorkflowKind, payload: &Payload, correlation_id: Option<&str>) -> Payload {
        let mut enriched = payload.clone();
        enriched.insert("triggeredAt".into(), Value::from(Utc::now().to_rfc3339()));
        enriched.insert("source".into(), Value::from(PAYLOAD_SOURCE));
        enriched.insert("workflowType".into(), Value::from(kind.as_str()));
        enriched.insert(
            "executionId".into(),
            Value::from(format!("{}_{}", kind.as_str(), Utc::now().timestamp_millis())),
        );
        enriched.insert(
            "correlationId".into(),
            correlation_id.map(Value::from).unwrap_or(Value::Null),
        );
        enriched
    }

    /// `true` when `url` answers 200
    async fn probe(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Health probe failed");
                false
            }
        }
    }

    async fn error_status(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        GatewayError::Status { status, body }
    }
}

#[async_trait]
impl EngineGateway for WebhookGateway {
    async fn trigger(
        &self,
        kind: WorkflowKind,
        payload: &Payload,
        correlation_id: Option<&str>,
    ) -> GatewayResult<ExecutionOutcome> {
        let url = self.webhook_endpoint(kind);
        let body = Self::enrich(kind, payload, correlation_id);
        let started = Instant::now();

        tracing::debug!(url = %url, kind = %kind, "Triggering workflow");
        let response = self.client.post(&url).json(&body).send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        let elapsed = started.elapsed().as_secs_f64();

        if !status.is_success() {
            tracing::warn!(kind = %kind, status = status.as_u16(), "Webhook rejected workflow");
            return Ok(
                ExecutionOutcome::failed(format!("HTTP {}: {}", status.as_u16(), text))
                    .with_duration(elapsed),
            );
        }

        let output = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(Value::Null) | Err(_) if text.trim().is_empty() => Payload::new(),
            Ok(other) => {
                let mut wrapped = Payload::new();
                wrapped.insert("response".into(), other);
                wrapped
            }
            Err(e) => return Err(GatewayError::Decode(e.to_string())),
        };

        let mut outcome = ExecutionOutcome::completed(output).with_duration(elapsed);
        outcome.engine_execution_id = outcome
            .output
            .as_ref()
            .and_then(|o| o.get("workflowId"))
            .and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        Ok(outcome)
    }

    async fn fetch_execution(&self, engine_execution_id: &str) -> GatewayResult<Option<ExecutionRecord>> {
        let url = self.engine_endpoint(&format!("/executions/{}", engine_execution_id));
        let response = self.client.get(&url).send().await.map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let execution: EngineExecution = response
                    .json()
                    .await
                    .map_err(|e| GatewayError::Decode(e.to_string()))?;
                let id = execution.id.clone();
                execution
                    .into_record()
                    .map(Some)
                    .ok_or(GatewayError::UnknownWorkflow(id))
            }
            _ => Err(Self::error_status(response).await),
        }
    }

    async fn list_executions(&self, filter: &ExecutionFilter) -> GatewayResult<Vec<ExecutionRecord>> {
        let mut query = vec![("limit", filter.limit.to_string())];
        if let Some(kind) = filter.workflow_kind {
            query.push(("workflowType", kind.as_str().to_string()));
        }
        if let Some(status) = filter.status {
            query.push(("status", status.as_str().to_string()));
        }

        let url = self.engine_endpoint("/executions");
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(Self::error_status(response).await);
        }

        let list: EngineExecutionList = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        Ok(list
            .data
            .into_iter()
            .filter_map(|execution| {
                let id = execution.id.clone();
                let record = execution.into_record();
                if record.is_none() {
                    tracing::debug!(engine_id = %id, "Skipping execution with unknown workflow");
                }
                record
            })
            .filter(|record| filter.matches(record))
            .collect())
    }

    async fn cancel(&self, engine_execution_id: &str) -> GatewayResult<bool> {
        let url = self.engine_endpoint(&format!("/executions/{}/stop", engine_execution_id));
        let response = self.client.post(&url).send().await.map_err(transport)?;
        Ok(response.status() == StatusCode::OK)
    }

    async fn health_check(&self) -> ServiceHealth {
        let engine_probe = self.engine_endpoint("/workflows");
        let webhook_probe = format!("{}/api/health", self.webhook_server_url);

        let running = ExecutionFilter {
            status: Some(ExecutionStatus::Running),
            limit: 100,
            ..Default::default()
        };
        let (engine_ok, webhook_ok, active) = tokio::join!(
            self.probe(&engine_probe),
            self.probe(&webhook_probe),
            self.list_executions(&running),
        );

        let extra = futures::future::join_all(
            self.config
                .probe_endpoints
                .iter()
                .map(|(name, url)| async move { (name.clone(), self.probe(url).await) }),
        )
        .await;

        let mut endpoints: BTreeMap<String, bool> = extra.into_iter().collect();
        endpoints.insert("engine_api".into(), engine_ok);
        endpoints.insert("webhook_server".into(), webhook_ok);

        let mut health = ServiceHealth::from_probes(engine_ok, webhook_ok);
        health.active_executions = active.map(|list| list.len()).unwrap_or(0);
        health.endpoints = endpoints;
        health
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}
