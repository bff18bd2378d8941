//! Catalyst: an event-driven multi-agent software-delivery orchestrator.

pub mod adapters;
pub mod api;
pub mod cli;
pub mod composition;
pub mod domain;
pub mod infrastructure;
pub mod services;
