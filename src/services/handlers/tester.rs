//! Tester stage: `code.pr.opened` -> `test.results`. The only handler that
//! invokes the Sandbox Executor.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::models::{Event, EventPayload, EventType, HandlerResult, TaskStatus, WorkspaceFile};

use super::HandlerContext;

pub async fn handle(ctx: Arc<HandlerContext>, event: Event) -> HandlerResult {
    if ctx.already_processed(&event).await {
        info!(event_id = %event.event_id, "tester: replayed event already recorded, skipping");
        return HandlerResult::Ok;
    }

    if !ctx.task_is_active(event.task_id).await {
        info!(task_id = %event.task_id, "tester: task is no longer active, aborting without propagating");
        return HandlerResult::Ok;
    }

    let files = match &event.payload {
        EventPayload::CodeBundle { files, .. } => files.clone(),
        other => {
            warn!(event_id = %event.event_id, payload = ?other, "tester: unexpected payload shape");
            return HandlerResult::Fatal;
        }
    };

    if ctx
        .store
        .update_task_status(event.task_id, TaskStatus::Running, Some(EventType::CodePrOpened))
        .await
        .is_err()
    {
        warn!(task_id = %event.task_id, "tester: failed to advance task status");
    }

    let workspace_files: Vec<WorkspaceFile> = files
        .into_iter()
        .map(|f| WorkspaceFile { path: f.path, contents: f.contents })
        .collect();

    let run = match ctx.sandbox.run_python_tests(workspace_files, Vec::new(), Vec::new(), Vec::new()).await {
        Ok(run) => run,
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "tester: sandbox execution failed");
            return HandlerResult::Retry;
        }
    };

    let summary = run.summary.unwrap_or_default();
    let next = Event::new(
        EventType::TestResults,
        event.trace_id,
        event.task_id,
        "tester",
        EventPayload::TestResults {
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
            errors: summary.errors,
            coverage_percent: summary.coverage_percent,
            stdout: run.run.stdout,
            exit_code: run.run.exit_code,
        },
    );

    match ctx.publisher.publish(&next).await {
        Ok(()) => HandlerResult::Ok,
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "tester: failed to publish test.results");
            HandlerResult::Retry
        }
    }
}
