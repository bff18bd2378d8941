//! Task State Store port (§4.G) — durable record of tasks and events.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::StoreError;
use crate::domain::models::{Event, EventAudit, Task, TaskStatus};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Idempotent by `task_id`: creating an existing task is a no-op.
    async fn create_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn update_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        current_phase: Option<crate::domain::models::EventType>,
    ) -> Result<(), StoreError>;

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Best-effort: failures are logged and swallowed by the caller, never
    /// propagated past the publisher (§4.G, §7).
    async fn record_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Chronologically ordered audit trail for one task.
    async fn load_task_history(&self, task_id: Uuid) -> Result<Vec<EventAudit>, StoreError>;

    /// Has this exact `event_id` already been recorded? Used by handlers to
    /// detect replays (§4.J, testable property 8).
    async fn event_recorded(&self, event_id: Uuid) -> Result<bool, StoreError>;
}
