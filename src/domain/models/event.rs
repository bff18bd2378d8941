//! Event domain model.
//!
//! An `Event` is an immutable message describing one stage transition in a
//! task's pipeline. Events are routed by `EventType`; the routing key sent
//! to the broker is always `catalyst.<event_type>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage-transition event types, one per vocabulary entry in the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TaskInitiated,
    PlanCreated,
    ArchitectureProposed,
    CodePrOpened,
    TestResults,
    ReviewDecision,
    DeployComplete,
    DeployFailed,
    ExplorerScanRequest,
    ExplorerScanComplete,
}

impl EventType {
    /// Dotted wire name, e.g. `task.initiated`.
    pub fn as_wire_name(&self) -> &'static str {
        match self {
            Self::TaskInitiated => "task.initiated",
            Self::PlanCreated => "plan.created",
            Self::ArchitectureProposed => "architecture.proposed",
            Self::CodePrOpened => "code.pr.opened",
            Self::TestResults => "test.results",
            Self::ReviewDecision => "review.decision",
            Self::DeployComplete => "deploy.complete",
            Self::DeployFailed => "deploy.failed",
            Self::ExplorerScanRequest => "explorer.scan.request",
            Self::ExplorerScanComplete => "explorer.scan.complete",
        }
    }

    pub fn from_wire_name(s: &str) -> Option<Self> {
        match s {
            "task.initiated" => Some(Self::TaskInitiated),
            "plan.created" => Some(Self::PlanCreated),
            "architecture.proposed" => Some(Self::ArchitectureProposed),
            "code.pr.opened" => Some(Self::CodePrOpened),
            "test.results" => Some(Self::TestResults),
            "review.decision" => Some(Self::ReviewDecision),
            "deploy.complete" => Some(Self::DeployComplete),
            "deploy.failed" => Some(Self::DeployFailed),
            "explorer.scan.request" => Some(Self::ExplorerScanRequest),
            "explorer.scan.complete" => Some(Self::ExplorerScanComplete),
            _ => None,
        }
    }

    /// Routing key as published/bound on the topic exchange: `catalyst.<event_type>`.
    pub fn routing_key(&self) -> String {
        format!("catalyst.{}", self.as_wire_name())
    }

    /// Queue that owns this event type per the §6.3 binding table.
    pub fn owning_queue(&self) -> &'static str {
        match self {
            Self::TaskInitiated => "planner-queue",
            Self::PlanCreated => "architect-queue",
            Self::ArchitectureProposed => "coder-queue",
            Self::CodePrOpened => "tester-queue",
            Self::TestResults => "reviewer-queue",
            Self::ReviewDecision => "deployer-queue",
            Self::ExplorerScanRequest => "explorer-queue",
            // orchestrator-queue binds catalyst.*.complete; both completion
            // kinds route there in addition to any stage-owning queue.
            Self::DeployComplete | Self::ExplorerScanComplete | Self::DeployFailed => {
                "orchestrator-queue"
            }
        }
    }

    /// The stage event this one produces on success, if the pipeline continues.
    pub fn next_on_success(&self) -> Option<Self> {
        match self {
            Self::TaskInitiated => Some(Self::PlanCreated),
            Self::PlanCreated => Some(Self::ArchitectureProposed),
            Self::ArchitectureProposed => Some(Self::CodePrOpened),
            Self::CodePrOpened => Some(Self::TestResults),
            Self::TestResults => Some(Self::ReviewDecision),
            Self::ReviewDecision => Some(Self::DeployComplete),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire_name())
    }
}

/// Stage-specific payload carried by an event. Each variant matches the
/// shape a handler actually produces/consumes for that stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// Original user prompt, carried by `task.initiated`.
    TaskPrompt { prompt: String },
    /// Free-form plan text produced by the planner.
    Plan { plan: String },
    /// Free-form architecture proposal produced by the architect.
    Architecture { design: String },
    /// Reference to the opened code change plus the generated test files.
    CodeBundle {
        pr_reference: String,
        files: Vec<CodeFile>,
    },
    /// Parsed sandbox test results.
    TestResults {
        passed: u32,
        failed: u32,
        skipped: u32,
        errors: u32,
        coverage_percent: Option<f64>,
        stdout: String,
        exit_code: i32,
    },
    /// Reviewer's decision.
    ReviewDecision { approved: bool, notes: String },
    /// Terminal success payload, carries an artefact reference.
    DeployArtifact { artifact_reference: String },
    /// Terminal failure payload.
    Failure { reason: String },
}

/// A single generated or modified file, part of a `CodeBundle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFile {
    pub path: String,
    pub contents: String,
}

/// An immutable message describing one stage transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub trace_id: Uuid,
    pub task_id: Uuid,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
    pub attempt: u32,
}

impl Event {
    /// Construct a first-attempt event (`attempt = 1`) as described in §3.1.
    pub fn new(
        event_type: EventType,
        trace_id: Uuid,
        task_id: Uuid,
        actor: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            trace_id,
            task_id,
            actor: actor.into(),
            timestamp: Utc::now(),
            payload,
            attempt: 1,
        }
    }

    /// Clone this event as a redelivery, incrementing `attempt`.
    #[must_use]
    pub fn redelivery(&self) -> Self {
        let mut next = self.clone();
        next.attempt += 1;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_key_preserves_dots() {
        assert_eq!(EventType::CodePrOpened.routing_key(), "catalyst.code.pr.opened");
    }

    #[test]
    fn wire_name_round_trips() {
        for ty in [
            EventType::TaskInitiated,
            EventType::PlanCreated,
            EventType::ArchitectureProposed,
            EventType::CodePrOpened,
            EventType::TestResults,
            EventType::ReviewDecision,
            EventType::DeployComplete,
            EventType::DeployFailed,
            EventType::ExplorerScanRequest,
            EventType::ExplorerScanComplete,
        ] {
            assert_eq!(EventType::from_wire_name(ty.as_wire_name()), Some(ty));
        }
    }

    #[test]
    fn first_publish_starts_at_attempt_one() {
        let e = Event::new(
            EventType::TaskInitiated,
            Uuid::new_v4(),
            Uuid::new_v4(),
            "orchestrator",
            EventPayload::TaskPrompt { prompt: "x".into() },
        );
        assert_eq!(e.attempt, 1);
        assert_eq!(e.redelivery().attempt, 2);
    }

    #[test]
    fn stage_chain_is_causally_ordered() {
        let mut ty = EventType::TaskInitiated;
        let mut chain = vec![ty];
        while let Some(next) = ty.next_on_success() {
            chain.push(next);
            ty = next;
        }
        assert_eq!(
            chain,
            vec![
                EventType::TaskInitiated,
                EventType::PlanCreated,
                EventType::ArchitectureProposed,
                EventType::CodePrOpened,
                EventType::TestResults,
                EventType::ReviewDecision,
                EventType::DeployComplete,
            ]
        );
    }
}
