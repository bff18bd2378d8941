//! Concrete implementations of the `domain::ports` traits.

pub mod amqp;
pub mod container;
pub mod llm;
pub mod sqlite;
