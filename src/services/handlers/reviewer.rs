//! Reviewer stage: `test.results` -> `review.decision`. A rejection is
//! terminal for this design: there is no automated path back to the coder.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::models::{Event, EventPayload, EventType, HandlerResult, TaskStatus};

use super::HandlerContext;

pub async fn handle(ctx: Arc<HandlerContext>, event: Event) -> HandlerResult {
    if ctx.already_processed(&event).await {
        info!(event_id = %event.event_id, "reviewer: replayed event already recorded, skipping");
        return HandlerResult::Ok;
    }

    if !ctx.task_is_active(event.task_id).await {
        info!(task_id = %event.task_id, "reviewer: task is no longer active, aborting without propagating");
        return HandlerResult::Ok;
    }

    let (passed, failed, errors, stdout) = match &event.payload {
        EventPayload::TestResults { passed, failed, errors, stdout, .. } => {
            (*passed, *failed, *errors, stdout.clone())
        }
        other => {
            warn!(event_id = %event.event_id, payload = ?other, "reviewer: unexpected payload shape");
            return HandlerResult::Fatal;
        }
    };

    if ctx
        .store
        .update_task_status(event.task_id, TaskStatus::Running, Some(EventType::TestResults))
        .await
        .is_err()
    {
        warn!(task_id = %event.task_id, "reviewer: failed to advance task status");
    }

    let approved = failed == 0 && errors == 0;
    let notes = match ctx
        .llm
        .generate(&format!(
            "Write one-sentence review notes for a change with {passed} passed, {failed} failed, {errors} errored tests:\n{stdout}"
        ))
        .await
    {
        Ok(text) => text,
        Err(err) if err.is_transient() => {
            warn!(task_id = %event.task_id, error = %err, "reviewer: transient LLM error, requesting redelivery");
            return HandlerResult::Retry;
        }
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "reviewer: permanent LLM error");
            return HandlerResult::Fatal;
        }
    };

    let next = Event::new(
        EventType::ReviewDecision,
        event.trace_id,
        event.task_id,
        "reviewer",
        EventPayload::ReviewDecision { approved, notes },
    );

    match ctx.publisher.publish(&next).await {
        Ok(()) => HandlerResult::Ok,
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "reviewer: failed to publish review.decision");
            HandlerResult::Retry
        }
    }
}
