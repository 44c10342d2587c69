//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        // Executions
        .route("/executions", post(handlers::submit_execution))
        .route("/executions", get(handlers::list_executions))
        .route("/executions/:id", get(handlers::get_execution))
        .route("/executions/:id/cancel", post(handlers::cancel_execution))
        // Per-workflow shortcuts
        .route(
            "/workflows/customer-analysis",
            post(handlers::trigger_customer_analysis),
        )
        .route(
            "/workflows/photo-analysis-processing",
            post(handlers::trigger_photo_analysis),
        )
        .route(
            "/workflows/crm-lead-management",
            post(handlers::trigger_crm_lead),
        )
        .route(
            "/workflows/follow-up-sequences",
            post(handlers::trigger_follow_up),
        )
        // Batches
        .route("/batches", post(handlers::submit_batch))
        // Engine view
        .route("/engine/executions", get(handlers::list_engine_executions))
        .route("/engine/health", get(handlers::engine_health))
        // Observability
        .route("/metrics/:kind", get(handlers::workflow_metrics))
        .route("/queue", get(handlers::queue_status))
        // Triggers
        .route("/triggers", get(handlers::list_triggers))
        .route("/triggers", post(handlers::register_trigger))
        .route("/triggers/evaluate", post(handlers::evaluate_triggers))
        .route("/triggers/:name", delete(handlers::delete_trigger))
        // Maintenance
        .route("/maintenance/cleanup", post(handlers::cleanup));

    // Build router with middleware
    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
