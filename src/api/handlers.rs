//! REST handlers for the subset of the surface that is core-relevant (§6.1).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::CatalystError;
use crate::domain::models::{
    LintRunResult, RunCommandRequest, RunCommandResult, Task, TestRunResult, WorkspaceFile,
};

use super::state::AppState;

impl IntoResponse for CatalystError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Sandbox(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Orchestrator(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
pub struct SubmitTaskRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct SubmitTaskResponse {
    pub task_id: Uuid,
    pub trace_id: Uuid,
}

pub async fn submit_task(
    State(state): State<AppState>,
    Json(request): Json<SubmitTaskRequest>,
) -> Result<Json<SubmitTaskResponse>, CatalystError> {
    let task_id = state.orchestrator.execute_task(request.prompt).await?;
    let task = state.store.get_task(task_id).await?.ok_or(CatalystError::NotFound)?;
    Ok(Json(SubmitTaskResponse { task_id: task.task_id, trace_id: task.trace_id }))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, CatalystError> {
    let task = state.store.get_task(task_id).await?.ok_or(CatalystError::NotFound)?;
    Ok(Json(task))
}

pub async fn get_task_logs(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Vec<crate::domain::models::EventAudit>>, CatalystError> {
    let history = state.store.load_task_history(task_id).await?;
    Ok(Json(history))
}

pub async fn sandbox_run(
    State(state): State<AppState>,
    Json(request): Json<RunCommandRequest>,
) -> Result<Json<RunCommandResult>, CatalystError> {
    let result = state.sandbox.run_command(request).await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct PythonTestRequest {
    pub test_files: Vec<WorkspaceFile>,
    #[serde(default)]
    pub source_files: Vec<WorkspaceFile>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

pub async fn sandbox_test_python(
    State(state): State<AppState>,
    Json(request): Json<PythonTestRequest>,
) -> Result<Json<TestRunResult>, CatalystError> {
    let result = state
        .sandbox
        .run_python_tests(request.test_files, request.source_files, request.requirements, request.extra_args)
        .await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct JavaScriptTestRequest {
    pub test_files: Vec<WorkspaceFile>,
    #[serde(default)]
    pub source_files: Vec<WorkspaceFile>,
    pub package_manifest: Option<WorkspaceFile>,
    #[serde(default)]
    pub test_command: Vec<String>,
}

pub async fn sandbox_test_javascript(
    State(state): State<AppState>,
    Json(request): Json<JavaScriptTestRequest>,
) -> Result<Json<TestRunResult>, CatalystError> {
    let result = state
        .sandbox
        .run_javascript_tests(request.test_files, request.source_files, request.package_manifest, request.test_command)
        .await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct LintRequest {
    pub files: Vec<WorkspaceFile>,
    pub linter: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

pub async fn sandbox_lint(
    State(state): State<AppState>,
    Json(request): Json<LintRequest>,
) -> Result<Json<LintRunResult>, CatalystError> {
    let result = state.sandbox.run_linter(request.files, request.linter, request.extra_args).await?;
    Ok(Json(result))
}

pub async fn sandbox_status(State(state): State<AppState>) -> Json<crate::domain::models::SandboxStatus> {
    Json(state.sandbox.status().await)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: DependencyHealth,
    pub store: DependencyHealth,
    pub broker: DependencyHealth,
    pub container_runtime: DependencyHealth,
    pub llm_credential: DependencyHealth,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = match state.store.event_recorded(Uuid::nil()).await {
        Ok(_) => DependencyHealth::Healthy,
        Err(_) => DependencyHealth::Unhealthy,
    };
    let broker = if state.publisher.health_check().await {
        DependencyHealth::Healthy
    } else {
        DependencyHealth::Degraded
    };
    let sandbox_status = state.sandbox.status().await;
    let container_runtime = if sandbox_status.container_runtime_ok {
        DependencyHealth::Healthy
    } else {
        DependencyHealth::Degraded
    };
    let llm_credential = if state.config.llm.api_key.is_some() {
        DependencyHealth::Healthy
    } else {
        DependencyHealth::Degraded
    };

    let overall = [store, broker, container_runtime, llm_credential]
        .into_iter()
        .max_by_key(|h| match h {
            DependencyHealth::Healthy => 0,
            DependencyHealth::Degraded => 1,
            DependencyHealth::Unhealthy => 2,
        })
        .unwrap_or(DependencyHealth::Healthy);

    Json(HealthResponse { status: overall, store, broker, container_runtime, llm_credential })
}
