//! Router wiring for the REST surface (§6.1).

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", post(handlers::submit_task))
        .route("/api/tasks/:id", get(handlers::get_task))
        .route("/api/logs/:task_id", get(handlers::get_task_logs))
        .route("/api/sandbox/run", post(handlers::sandbox_run))
        .route("/api/sandbox/test/python", post(handlers::sandbox_test_python))
        .route("/api/sandbox/test/javascript", post(handlers::sandbox_test_javascript))
        .route("/api/sandbox/lint", post(handlers::sandbox_lint))
        .route("/api/sandbox/status", get(handlers::sandbox_status))
        .route("/api/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
