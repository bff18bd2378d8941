//! Hierarchical configuration using figment: defaults, project file, then
//! environment variables.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
