//! Agent Worker (§4.E): thin wrapper binding one agent's queue to its
//! handler function, owning the worker-side cancellation token.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::adapters::amqp::consumer::{EventConsumer, Handler};
use crate::domain::models::EventType;

pub struct AgentWorker {
    consumer: EventConsumer,
    handler: Handler,
}

impl AgentWorker {
    pub fn new(
        agent_name: impl Into<String>,
        queue_name: impl Into<String>,
        routing_keys: Vec<String>,
        broker_url: impl Into<String>,
        handler: Handler,
    ) -> Self {
        Self {
            consumer: EventConsumer::new(agent_name, queue_name, routing_keys, broker_url),
            handler,
        }
    }

    /// Queue name for the given event type's owning agent (§6.3), used by
    /// the Worker Manager to construct one `AgentWorker` per agent kind.
    pub fn queue_for(event_type: EventType) -> &'static str {
        event_type.owning_queue()
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        self.consumer.start_consuming(Arc::clone(&self.handler), 1, shutdown).await;
    }
}
