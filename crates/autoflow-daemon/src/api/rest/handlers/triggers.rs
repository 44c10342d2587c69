//! Trigger registry handlers

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use autoflow_types::TriggerConfig;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

/// Register trigger response
#[derive(Debug, Serialize)]
pub struct RegisterTriggerResponse {
    pub name: String,
    pub replaced: bool,
}

/// List registered triggers
pub async fn list_triggers(State(state): State<AppState>) -> Json<Vec<TriggerConfig>> {
    Json(state.orchestrator.list_triggers().await)
}

/// Register or replace a trigger
pub async fn register_trigger(
    State(state): State<AppState>,
    Json(config): Json<TriggerConfig>,
) -> ApiResult<(StatusCode, Json<RegisterTriggerResponse>)> {
    let name = config.name.clone();
    let previous = state.orchestrator.add_trigger(config).await?;
    let status = if previous.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((
        status,
        Json(RegisterTriggerResponse {
            name,
            replaced: previous.is_some(),
        }),
    ))
}

/// Remove a trigger
pub async fn delete_trigger(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    if state.orchestrator.remove_trigger(&name).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Trigger {} not found", name)))
    }
}
