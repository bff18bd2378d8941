//! Coder stage: `architecture.proposed` -> `code.pr.opened`.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{CodeFile, Event, EventPayload, EventType, HandlerResult, TaskStatus};

use super::HandlerContext;

pub async fn handle(ctx: Arc<HandlerContext>, event: Event) -> HandlerResult {
    if ctx.already_processed(&event).await {
        info!(event_id = %event.event_id, "coder: replayed event already recorded, skipping");
        return HandlerResult::Ok;
    }

    if !ctx.task_is_active(event.task_id).await {
        info!(task_id = %event.task_id, "coder: task is no longer active, aborting without propagating");
        return HandlerResult::Ok;
    }

    let design = match &event.payload {
        EventPayload::Architecture { design } => design.clone(),
        other => {
            warn!(event_id = %event.event_id, payload = ?other, "coder: unexpected payload shape");
            return HandlerResult::Fatal;
        }
    };

    if ctx
        .store
        .update_task_status(event.task_id, TaskStatus::Running, Some(EventType::ArchitectureProposed))
        .await
        .is_err()
    {
        warn!(task_id = %event.task_id, "coder: failed to advance task status");
    }

    let generated = match ctx
        .llm
        .generate(&format!("Implement the following architecture, as a single source file:\n{design}"))
        .await
    {
        Ok(text) => text,
        Err(err) if err.is_transient() => {
            warn!(task_id = %event.task_id, error = %err, "coder: transient LLM error, requesting redelivery");
            return HandlerResult::Retry;
        }
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "coder: permanent LLM error");
            return HandlerResult::Fatal;
        }
    };

    let next = Event::new(
        EventType::CodePrOpened,
        event.trace_id,
        event.task_id,
        "coder",
        EventPayload::CodeBundle {
            pr_reference: format!("pr-{}", Uuid::new_v4()),
            files: vec![CodeFile { path: "solution.py".to_string(), contents: generated }],
        },
    );

    match ctx.publisher.publish(&next).await {
        Ok(()) => HandlerResult::Ok,
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "coder: failed to publish code.pr.opened");
            HandlerResult::Retry
        }
    }
}
