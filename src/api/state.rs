//! Shared application state for the REST edge (§6.1).

use std::sync::Arc;

use crate::domain::models::Config;
use crate::domain::ports::{EventPublisher, TaskStore};
use crate::services::{Orchestrator, SandboxExecutor};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub orchestrator: Arc<Orchestrator>,
    pub sandbox: Arc<SandboxExecutor>,
    pub config: Config,
}
