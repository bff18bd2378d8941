//! SQLite-backed `TaskStore` (§4.G, §6.4).

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::StoreError;
use crate::domain::models::{Event, EventAudit, EventType, Task, TaskStatus};
use crate::domain::ports::TaskStore;

pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create_task(&self, task: &Task) -> Result<(), StoreError> {
        // Idempotent by task_id per §4.G.
        sqlx::query(
            "INSERT INTO tasks (task_id, trace_id, prompt, status, current_phase, created_at, updated_at, cost_estimate)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(task_id) DO NOTHING",
        )
        .bind(task.task_id.to_string())
        .bind(task.trace_id.to_string())
        .bind(&task.prompt)
        .bind(task.status.as_str())
        .bind(task.current_phase.map(|p| p.as_wire_name()))
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .bind(task.cost_estimate)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        current_phase: Option<EventType>,
    ) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, current_phase = COALESCE(?, current_phase), updated_at = ? WHERE task_id = ?",
        )
        .bind(status.as_str())
        .bind(current_phase.map(|p| p.as_wire_name()))
        .bind(now)
        .bind(task_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        let row: Option<(String, String, String, String, Option<String>, String, String, Option<f64>)> =
            sqlx::query_as(
                "SELECT task_id, trace_id, prompt, status, current_phase, created_at, updated_at, cost_estimate
                 FROM tasks WHERE task_id = ?",
            )
            .bind(task_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let Some((task_id, trace_id, prompt, status, current_phase, created_at, updated_at, cost_estimate)) = row
        else {
            return Ok(None);
        };

        Ok(Some(Task {
            task_id: Uuid::parse_str(&task_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
            trace_id: Uuid::parse_str(&trace_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
            prompt,
            status: TaskStatus::from_str(&status).ok_or(StoreError::Serialization(status))?,
            current_phase: current_phase.and_then(|p| EventType::from_wire_name(&p)),
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StoreError::Serialization(e.to_string()))?
                .with_timezone(&chrono::Utc),
            updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
                .map_err(|e| StoreError::Serialization(e.to_string()))?
                .with_timezone(&chrono::Utc),
            cost_estimate,
        }))
    }

    async fn record_event(&self, event: &Event) -> Result<(), StoreError> {
        let audit = EventAudit::from_event(event);
        sqlx::query(
            "INSERT INTO agent_events (event_id, event_type, task_id, trace_id, actor, timestamp, payload_digest)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(event_id) DO NOTHING",
        )
        .bind(audit.event_id.to_string())
        .bind(audit.event_type.as_wire_name())
        .bind(audit.task_id.to_string())
        .bind(audit.trace_id.to_string())
        .bind(&audit.actor)
        .bind(audit.timestamp.to_rfc3339())
        .bind(&audit.payload_digest)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn load_task_history(&self, task_id: Uuid) -> Result<Vec<EventAudit>, StoreError> {
        let rows: Vec<(String, String, String, String, String, String, String)> = sqlx::query_as(
            "SELECT event_id, event_type, task_id, trace_id, actor, timestamp, payload_digest
             FROM agent_events WHERE task_id = ? ORDER BY timestamp ASC",
        )
        .bind(task_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|(event_id, event_type, task_id, trace_id, actor, timestamp, payload_digest)| {
                Ok(EventAudit {
                    event_id: Uuid::parse_str(&event_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
                    event_type: EventType::from_wire_name(&event_type)
                        .ok_or_else(|| StoreError::Serialization(event_type.clone()))?,
                    task_id: Uuid::parse_str(&task_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
                    trace_id: Uuid::parse_str(&trace_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
                    actor,
                    timestamp: chrono::DateTime::parse_from_rfc3339(&timestamp)
                        .map_err(|e| StoreError::Serialization(e.to_string()))?
                        .with_timezone(&chrono::Utc),
                    payload_digest,
                })
            })
            .collect()
    }

    async fn event_recorded(&self, event_id: Uuid) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM agent_events WHERE event_id = ?")
            .bind(event_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::connection::create_test_pool;
    use crate::adapters::sqlite::migrations::Migrator;
    use crate::domain::models::EventPayload;

    async fn store() -> SqliteTaskStore {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone()).run().await.unwrap();
        SqliteTaskStore::new(pool)
    }

    #[tokio::test]
    async fn create_task_is_idempotent_by_task_id() {
        let store = store().await;
        let task = Task::new("build a counter app");
        store.create_task(&task).await.unwrap();
        store.create_task(&task).await.unwrap();

        let loaded = store.get_task(task.task_id).await.unwrap().unwrap();
        assert_eq!(loaded.prompt, "build a counter app");
    }

    #[tokio::test]
    async fn update_status_unknown_task_errors() {
        let store = store().await;
        let result = store
            .update_task_status(Uuid::new_v4(), TaskStatus::Running, None)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn record_event_and_history_round_trip() {
        let store = store().await;
        let task = Task::new("x");
        store.create_task(&task).await.unwrap();

        let e1 = Event::new(
            EventType::TaskInitiated,
            task.trace_id,
            task.task_id,
            "orchestrator",
            EventPayload::TaskPrompt { prompt: "x".into() },
        );
        store.record_event(&e1).await.unwrap();
        assert!(store.event_recorded(e1.event_id).await.unwrap());

        let history = store.load_task_history(task.task_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_id, e1.event_id);
    }

    #[tokio::test]
    async fn duplicate_event_id_is_not_double_recorded() {
        let store = store().await;
        let task = Task::new("x");
        store.create_task(&task).await.unwrap();
        let e1 = Event::new(
            EventType::TaskInitiated,
            task.trace_id,
            task.task_id,
            "orchestrator",
            EventPayload::TaskPrompt { prompt: "x".into() },
        );
        store.record_event(&e1).await.unwrap();
        store.record_event(&e1).await.unwrap();
        let history = store.load_task_history(task.task_id).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
