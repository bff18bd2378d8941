//! Architect stage: `plan.created` -> `architecture.proposed`.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::models::{Event, EventPayload, EventType, HandlerResult, TaskStatus};

use super::HandlerContext;

pub async fn handle(ctx: Arc<HandlerContext>, event: Event) -> HandlerResult {
    if ctx.already_processed(&event).await {
        info!(event_id = %event.event_id, "architect: replayed event already recorded, skipping");
        return HandlerResult::Ok;
    }

    if !ctx.task_is_active(event.task_id).await {
        info!(task_id = %event.task_id, "architect: task is no longer active, aborting without propagating");
        return HandlerResult::Ok;
    }

    let plan = match &event.payload {
        EventPayload::Plan { plan } => plan.clone(),
        other => {
            warn!(event_id = %event.event_id, payload = ?other, "architect: unexpected payload shape");
            return HandlerResult::Fatal;
        }
    };

    if ctx
        .store
        .update_task_status(event.task_id, TaskStatus::Running, Some(EventType::PlanCreated))
        .await
        .is_err()
    {
        warn!(task_id = %event.task_id, "architect: failed to advance task status");
    }

    let design = match ctx.generate_with_retry(&format!("Propose a system architecture for plan:\n{plan}")).await {
        Ok(text) => text,
        Err(err) if err.is_transient() => {
            warn!(task_id = %event.task_id, error = %err, "architect: transient LLM error, requesting redelivery");
            return HandlerResult::Retry;
        }
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "architect: permanent LLM error");
            return HandlerResult::Fatal;
        }
    };

    let next = Event::new(
        EventType::ArchitectureProposed,
        event.trace_id,
        event.task_id,
        "architect",
        EventPayload::Architecture { design },
    );

    match ctx.publisher.publish(&next).await {
        Ok(()) => HandlerResult::Ok,
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "architect: failed to publish architecture.proposed");
            HandlerResult::Retry
        }
    }
}
