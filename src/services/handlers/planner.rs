//! Planner stage: `task.initiated` -> `plan.created`.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::models::{Event, EventPayload, EventType, HandlerResult, TaskStatus};

use super::HandlerContext;

pub async fn handle(ctx: Arc<HandlerContext>, event: Event) -> HandlerResult {
    if ctx.already_processed(&event).await {
        info!(event_id = %event.event_id, "planner: replayed event already recorded, skipping");
        return HandlerResult::Ok;
    }

    if !ctx.task_is_active(event.task_id).await {
        info!(task_id = %event.task_id, "planner: task is no longer active, aborting without propagating");
        return HandlerResult::Ok;
    }

    let prompt = match &event.payload {
        EventPayload::TaskPrompt { prompt } => prompt.clone(),
        other => {
            warn!(event_id = %event.event_id, payload = ?other, "planner: unexpected payload shape");
            return HandlerResult::Fatal;
        }
    };

    if ctx
        .store
        .update_task_status(event.task_id, TaskStatus::Running, Some(EventType::TaskInitiated))
        .await
        .is_err()
    {
        warn!(task_id = %event.task_id, "planner: failed to advance task status");
    }

    let plan = match ctx.generate_with_retry(&format!("Produce a delivery plan for: {prompt}")).await {
        Ok(text) => text,
        Err(err) if err.is_transient() => {
            warn!(task_id = %event.task_id, error = %err, "planner: transient LLM error, requesting redelivery");
            return HandlerResult::Retry;
        }
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "planner: permanent LLM error");
            return HandlerResult::Fatal;
        }
    };

    let next = Event::new(
        EventType::PlanCreated,
        event.trace_id,
        event.task_id,
        "planner",
        EventPayload::Plan { plan },
    );

    match ctx.publisher.publish(&next).await {
        Ok(()) => HandlerResult::Ok,
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "planner: failed to publish plan.created");
            HandlerResult::Retry
        }
    }
}
