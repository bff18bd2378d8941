//! Task domain model.
//!
//! A task enters at `pending`, moves to `running` on first event publish,
//! and terminates at `completed` (on `deploy.complete`) or `failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::EventType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A task entering the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: Uuid,
    pub trace_id: Uuid,
    pub prompt: String,
    pub status: TaskStatus,
    pub current_phase: Option<EventType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cost_estimate: Option<f64>,
}

impl Task {
    /// Create a new, `pending` task with a fresh `task_id`/`trace_id`.
    pub fn new(prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4(),
            trace_id: Uuid::new_v4(),
            prompt: prompt.into(),
            status: TaskStatus::Pending,
            current_phase: None,
            created_at: now,
            updated_at: now,
            cost_estimate: None,
        }
    }

    /// Mark the task `running` and record the phase just observed.
    pub fn advance(&mut self, phase: EventType) {
        self.status = TaskStatus::Running;
        self.current_phase = Some(phase);
        self.updated_at = Utc::now();
    }

    /// Transition to a terminal state.
    pub fn finish(&mut self, status: TaskStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn add_cost(&mut self, cost: f64) {
        self.cost_estimate = Some(self.cost_estimate.unwrap_or(0.0) + cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_pending_with_no_phase() {
        let t = Task::new("build a counter app");
        assert_eq!(t.status, TaskStatus::Pending);
        assert!(t.current_phase.is_none());
        assert_eq!(t.trace_id, t.trace_id);
    }

    #[test]
    fn advance_marks_running_and_records_phase() {
        let mut t = Task::new("x");
        t.advance(EventType::PlanCreated);
        assert_eq!(t.status, TaskStatus::Running);
        assert_eq!(t.current_phase, Some(EventType::PlanCreated));
    }

    #[test]
    fn finish_is_terminal() {
        let mut t = Task::new("x");
        t.finish(TaskStatus::Completed);
        assert!(t.status.is_terminal());
    }

    #[test]
    fn cost_accumulates() {
        let mut t = Task::new("x");
        t.add_cost(0.10);
        t.add_cost(0.25);
        assert_eq!(t.cost_estimate, Some(0.35));
    }
}
