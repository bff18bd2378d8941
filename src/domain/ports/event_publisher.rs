//! Event Publisher port. The orchestrator and handlers depend on this
//! trait, not on the concrete `lapin`-backed implementation, so tests can
//! substitute an in-memory fake.

use async_trait::async_trait;

use crate::domain::errors::PublishError;
use crate::domain::models::Event;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &Event) -> Result<(), PublishError>;

    /// Lightweight liveness probe backing `/api/health`'s broker status.
    /// Sequential-mode stand-ins (no real broker) report healthy.
    async fn health_check(&self) -> bool {
        true
    }
}
