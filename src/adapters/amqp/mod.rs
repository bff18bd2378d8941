//! AMQP/RabbitMQ adapter: topology declaration, publishing, and per-agent
//! consumption.

pub mod consumer;
pub mod publisher;
pub mod topology;

pub use consumer::{EventConsumer, Handler};
pub use publisher::EventPublisher;
pub use topology::TopologyInitialiser;
