//! Typed shortcuts for each workflow kind
//!
//! Each handler shapes the payload the engine workflow expects and submits
//! it with a kind-specific correlation id (`{prefix}_{8 hex}`).

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use autoflow_types::{ExecutionRecord, Payload, SubmitRequest, WorkflowKind};
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

/// Customer analysis request
#[derive(Debug, Deserialize)]
pub struct CustomerAnalysisRequest {
    /// photo, text or preferences
    pub analysis_type: String,
    pub room_type: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    /// Merged over the named fields
    #[serde(default)]
    pub additional_data: Payload,
}

/// Photo analysis processing request
#[derive(Debug, Deserialize)]
pub struct PhotoAnalysisRequest {
    pub extracted_colors: Vec<String>,
    pub room_context: Payload,
    #[serde(default)]
    pub recommendations: Vec<Payload>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub metadata: Payload,
}

/// CRM lead management request
#[derive(Debug, Deserialize)]
pub struct CrmLeadRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub analysis_data: Payload,
    pub room_type: String,
    pub analysis_type: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default = "default_lead_source")]
    pub lead_source: String,
}

/// Follow-up sequence request
#[derive(Debug, Deserialize)]
pub struct FollowUpRequest {
    /// immediate, personal, targeted or basic
    pub follow_up_type: String,
    pub customer_data: Payload,
    #[serde(default = "default_lead_score")]
    pub lead_score: u8,
    #[serde(default = "default_follow_up_action")]
    pub follow_up_action: String,
    #[serde(default = "default_delay_hours")]
    pub delay_hours: u32,
}

fn default_confidence() -> f64 {
    0.8
}

fn default_lead_source() -> String {
    "sanzo-color-advisor".to_string()
}

fn default_lead_score() -> u8 {
    50
}

fn default_follow_up_action() -> String {
    "email".to_string()
}

fn default_delay_hours() -> u32 {
    24
}

impl CustomerAnalysisRequest {
    fn into_payload(self) -> Payload {
        let mut payload = object(json!({
            "analysisType": self.analysis_type,
            "roomType": self.room_type,
            "customerEmail": self.customer_email,
            "customerName": self.customer_name,
            "ageGroup": self.age_group,
        }));
        payload.extend(self.additional_data);
        payload
    }
}

impl PhotoAnalysisRequest {
    fn into_payload(self) -> ApiResult<Payload> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ApiError::Validation(format!(
                "confidence must be between 0 and 1, got {}",
                self.confidence
            )));
        }
        Ok(object(json!({
            "extractedColors": self.extracted_colors,
            "roomContext": self.room_context,
            "recommendations": self.recommendations,
            "confidence": self.confidence,
            "metadata": self.metadata,
        })))
    }
}

impl CrmLeadRequest {
    fn into_payload(self) -> Payload {
        object(json!({
            "customerName": self.customer_name,
            "customerEmail": self.customer_email,
            "analysisData": self.analysis_data,
            "roomType": self.room_type,
            "analysisType": self.analysis_type,
            "customerPhone": self.customer_phone,
            "leadSource": self.lead_source,
        }))
    }
}

impl FollowUpRequest {
    fn into_payload(self) -> ApiResult<Payload> {
        if self.lead_score > 100 {
            return Err(ApiError::Validation(format!(
                "lead_score must be between 0 and 100, got {}",
                self.lead_score
            )));
        }
        Ok(object(json!({
            "followUpType": self.follow_up_type,
            "customerData": self.customer_data,
            "leadScore": self.lead_score,
            "followUpAction": self.follow_up_action,
            "delayHours": self.delay_hours,
        })))
    }
}

fn object(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

/// `{prefix}_{8 hex}`
fn correlation_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &id[..8])
}

async fn submit(
    state: &AppState,
    kind: WorkflowKind,
    payload: Payload,
    prefix: &str,
) -> ApiResult<Json<ExecutionRecord>> {
    let request = SubmitRequest::new(kind, payload).with_correlation_id(correlation_id(prefix));
    let record = state.orchestrator.submit(request).await?;
    Ok(Json(record))
}

/// Run the customer analysis workflow
pub async fn trigger_customer_analysis(
    State(state): State<AppState>,
    Json(request): Json<CustomerAnalysisRequest>,
) -> ApiResult<Json<ExecutionRecord>> {
    submit(
        &state,
        WorkflowKind::CustomerAnalysis,
        request.into_payload(),
        "quick_analysis",
    )
    .await
}

/// Run the photo analysis processing workflow
pub async fn trigger_photo_analysis(
    State(state): State<AppState>,
    Json(request): Json<PhotoAnalysisRequest>,
) -> ApiResult<Json<ExecutionRecord>> {
    let payload = request.into_payload()?;
    submit(
        &state,
        WorkflowKind::PhotoAnalysisProcessing,
        payload,
        "photo_analysis",
    )
    .await
}

/// Run the CRM lead management workflow
pub async fn trigger_crm_lead(
    State(state): State<AppState>,
    Json(request): Json<CrmLeadRequest>,
) -> ApiResult<Json<ExecutionRecord>> {
    submit(
        &state,
        WorkflowKind::CrmLeadManagement,
        request.into_payload(),
        "crm_lead",
    )
    .await
}

/// Run the follow-up sequences workflow
pub async fn trigger_follow_up(
    State(state): State<AppState>,
    Json(request): Json<FollowUpRequest>,
) -> ApiResult<Json<ExecutionRecord>> {
    let payload = request.into_payload()?;
    submit(&state, WorkflowKind::FollowUpSequences, payload, "follow_up").await
}
