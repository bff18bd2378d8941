//! Dual-Mode Orchestrator (§4.H): the only component that knows whether the
//! deployment is event-driven or sequential. Both modes exercise the same
//! handler code (§4.H rationale).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::errors::{OrchestratorError, PublishError};
use crate::domain::models::{Config, Event, EventPayload, EventType, HandlerResult, Mode, Task, TaskStatus};
use crate::domain::ports::{EventPublisher, TaskStore};
use crate::services::handlers::{self, HandlerContext};

pub struct Orchestrator {
    store: Arc<dyn TaskStore>,
    broker_publisher: Arc<dyn EventPublisher>,
    handler_ctx: Arc<HandlerContext>,
    config: Config,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        broker_publisher: Arc<dyn EventPublisher>,
        handler_ctx: Arc<HandlerContext>,
        config: Config,
    ) -> Self {
        Self { store, broker_publisher, handler_ctx, config }
    }

    pub async fn execute_task(&self, prompt: String) -> Result<Uuid, OrchestratorError> {
        let task = Task::new(prompt.clone());
        let task_id = task.task_id;
        let trace_id = task.trace_id;
        self.store.create_task(&task).await?;

        match self.config.mode {
            Mode::EventDriven => {
                let event = Event::new(
                    EventType::TaskInitiated,
                    trace_id,
                    task_id,
                    "orchestrator",
                    EventPayload::TaskPrompt { prompt },
                );
                self.broker_publisher.publish(&event).await?;
                self.store.update_task_status(task_id, TaskStatus::Running, Some(EventType::TaskInitiated)).await?;
                Ok(task_id)
            }
            Mode::Sequential => self.run_sequential(task_id, trace_id, prompt).await,
        }
    }

    /// Drives the handler chain in-process, using a capturing publisher in
    /// place of the broker so the same handler functions run unmodified.
    async fn run_sequential(&self, task_id: Uuid, trace_id: Uuid, prompt: String) -> Result<Uuid, OrchestratorError> {
        let captured = Arc::new(Mutex::new(None));
        let local_publisher: Arc<dyn EventPublisher> = Arc::new(CapturingPublisher { captured: Arc::clone(&captured) });

        let sequential_ctx = Arc::new(HandlerContext {
            store: Arc::clone(&self.handler_ctx.store),
            publisher: local_publisher,
            llm: Arc::clone(&self.handler_ctx.llm),
            sandbox: Arc::clone(&self.handler_ctx.sandbox),
            config: self.config.clone(),
        });

        let mut event = Event::new(
            EventType::TaskInitiated,
            trace_id,
            task_id,
            "orchestrator",
            EventPayload::TaskPrompt { prompt },
        );

        let dispatch = handlers::dispatch_table();

        while let Some(handler_fn) =
            dispatch.iter().find(|(ty, _)| *ty == event.event_type).map(|(_, f)| *f)
        {
            match handler_fn(Arc::clone(&sequential_ctx), event.clone()).await {
                HandlerResult::Ok => {}
                HandlerResult::Retry | HandlerResult::Fatal => {
                    self.store
                        .update_task_status(task_id, TaskStatus::Failed, Some(event.event_type))
                        .await?;
                    return Err(OrchestratorError::StageFailed {
                        stage: event.event_type.to_string(),
                        reason: "handler did not complete successfully".to_string(),
                    });
                }
            }

            let next = captured.lock().await.take();
            if let Some(next_event) = next {
                if next_event.event_type == EventType::DeployFailed {
                    self.store
                        .update_task_status(task_id, TaskStatus::Failed, Some(EventType::DeployFailed))
                        .await?;
                    return Ok(task_id);
                }
                event = next_event;
            } else {
                self.store
                    .update_task_status(task_id, TaskStatus::Failed, Some(event.event_type))
                    .await?;
                return Err(OrchestratorError::StageFailed {
                    stage: event.event_type.to_string(),
                    reason: "handler produced no downstream event".to_string(),
                });
            }

            if event.event_type == EventType::DeployComplete {
                self.store.update_task_status(task_id, TaskStatus::Completed, Some(EventType::DeployComplete)).await?;
                return Ok(task_id);
            }
        }

        Ok(task_id)
    }
}

/// Stand-in for the broker publisher in sequential mode: stores the one
/// event a handler publishes instead of sending it over AMQP.
struct CapturingPublisher {
    captured: Arc<Mutex<Option<Event>>>,
}

#[async_trait]
impl EventPublisher for CapturingPublisher {
    async fn publish(&self, event: &Event) -> Result<(), PublishError> {
        *self.captured.lock().await = Some(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::container::fake_runtime::FakeRuntime;
    use crate::adapters::sqlite::{connection::create_test_pool, migrations::Migrator, SqliteTaskStore};
    use crate::domain::ports::LlmError;
    use async_trait::async_trait as at;

    struct StubLlm;

    #[at]
    impl crate::domain::ports::LlmClient for StubLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok("canned response".to_string())
        }
    }

    async fn store() -> Arc<dyn TaskStore> {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone()).run().await.unwrap();
        Arc::new(SqliteTaskStore::new(pool))
    }

    fn handler_ctx(store: Arc<dyn TaskStore>, config: Config) -> Arc<HandlerContext> {
        Arc::new(HandlerContext::new(
            store,
            Arc::new(CapturingPublisher { captured: Arc::new(Mutex::new(None)) }),
            Arc::new(StubLlm),
            Arc::new(FakeRuntime::new()),
            config,
        ))
    }

    #[tokio::test]
    async fn sequential_mode_runs_to_deploy_complete_with_canned_llm() {
        let config = Config { mode: Mode::Sequential, ..Config::default() };
        let store = store().await;
        let ctx = handler_ctx(Arc::clone(&store), config.clone());
        let broker_publisher: Arc<dyn EventPublisher> =
            Arc::new(CapturingPublisher { captured: Arc::new(Mutex::new(None)) });

        let orchestrator = Orchestrator::new(Arc::clone(&store), broker_publisher, ctx, config);
        let task_id = orchestrator.execute_task("build a counter app".to_string()).await.unwrap();

        let task = store.get_task(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }
}
