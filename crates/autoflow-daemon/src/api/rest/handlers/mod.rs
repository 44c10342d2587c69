//! API request handlers

mod batches;
mod executions;
mod system;
mod triggers;
mod workflows;

pub use batches::*;
pub use executions::*;
pub use system::*;
pub use triggers::*;
pub use workflows::*;

use crate::error::{ApiError, ApiResult};
use autoflow_types::WorkflowKind;

/// Parse a workflow kind from its wire name
pub(crate) fn parse_kind(raw: &str) -> ApiResult<WorkflowKind> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown workflow type: {}", raw)))
}
