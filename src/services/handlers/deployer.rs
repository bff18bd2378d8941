//! Deployer stage: `review.decision` -> terminal `deploy.complete` /
//! `deploy.failed`. A rejected review is not retried; it is terminal.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{Event, EventPayload, EventType, HandlerResult, TaskStatus};

use super::HandlerContext;

pub async fn handle(ctx: Arc<HandlerContext>, event: Event) -> HandlerResult {
    if ctx.already_processed(&event).await {
        info!(event_id = %event.event_id, "deployer: replayed event already recorded, skipping");
        return HandlerResult::Ok;
    }

    if !ctx.task_is_active(event.task_id).await {
        info!(task_id = %event.task_id, "deployer: task is no longer active, aborting without propagating");
        return HandlerResult::Ok;
    }

    let (approved, notes) = match &event.payload {
        EventPayload::ReviewDecision { approved, notes } => (*approved, notes.clone()),
        other => {
            warn!(event_id = %event.event_id, payload = ?other, "deployer: unexpected payload shape");
            return HandlerResult::Fatal;
        }
    };

    if !approved {
        let _ = ctx.store.update_task_status(event.task_id, TaskStatus::Failed, Some(EventType::ReviewDecision)).await;
        let next = Event::new(
            EventType::DeployFailed,
            event.trace_id,
            event.task_id,
            "deployer",
            EventPayload::Failure { reason: format!("review rejected: {notes}") },
        );
        return match ctx.publisher.publish(&next).await {
            Ok(()) => HandlerResult::Ok,
            Err(err) => {
                warn!(task_id = %event.task_id, error = %err, "deployer: failed to publish deploy.failed");
                HandlerResult::Retry
            }
        };
    }

    if ctx
        .store
        .update_task_status(event.task_id, TaskStatus::Running, Some(EventType::ReviewDecision))
        .await
        .is_err()
    {
        warn!(task_id = %event.task_id, "deployer: failed to advance task status");
    }

    let deployment_notes = match ctx.generate_with_retry("Name the deployment artefact for this approved change.").await {
        Ok(text) => text,
        Err(err) if err.is_transient() => {
            warn!(task_id = %event.task_id, error = %err, "deployer: transient LLM error, requesting redelivery");
            return HandlerResult::Retry;
        }
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "deployer: permanent LLM error");
            return HandlerResult::Fatal;
        }
    };
    let artifact_reference = format!("artifact-{}: {}", Uuid::new_v4(), deployment_notes.trim());

    let next = Event::new(
        EventType::DeployComplete,
        event.trace_id,
        event.task_id,
        "deployer",
        EventPayload::DeployArtifact { artifact_reference },
    );

    match ctx.publisher.publish(&next).await {
        Ok(()) => {
            let _ = ctx.store.update_task_status(event.task_id, TaskStatus::Completed, Some(EventType::DeployComplete)).await;
            HandlerResult::Ok
        }
        Err(err) => {
            warn!(task_id = %event.task_id, error = %err, "deployer: failed to publish deploy.complete");
            HandlerResult::Retry
        }
    }
}
