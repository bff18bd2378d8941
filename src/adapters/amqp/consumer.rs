//! Event Consumer (§4.D): one instance per Worker, running an infinite
//! reconnection loop with FIFO, prefetch-bounded delivery.

use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, Connection, ConnectionProperties};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use lapin::options::BasicPublishOptions;
use lapin::BasicProperties;

use crate::adapters::amqp::topology::EXCHANGE_NAME;
use crate::domain::errors::PublishError;
use crate::domain::models::{Event, HandlerResult};

const QUEUE_TTL_MS: i32 = 3_600_000;
const QUEUE_MAX_LENGTH: i32 = 10_000;
const DLQ_NAME: &str = "failed-events";
const MAX_DELIVERY_ATTEMPTS: u32 = 3;

pub type Handler = Arc<
    dyn Fn(Event) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>> + Send + Sync,
>;

pub struct EventConsumer {
    agent_name: String,
    queue_name: String,
    routing_keys: Vec<String>,
    broker_url: String,
}

impl EventConsumer {
    pub fn new(
        agent_name: impl Into<String>,
        queue_name: impl Into<String>,
        routing_keys: Vec<String>,
        broker_url: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            queue_name: queue_name.into(),
            routing_keys,
            broker_url: broker_url.into(),
        }
    }

    /// Blocks (cooperatively) until `shutdown` is cancelled, running the
    /// reconnection loop pseudocoded in §4.D.
    pub async fn start_consuming(&self, handler: Handler, prefetch: u16, shutdown: CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                return;
            }

            match self.connect_and_declare().await {
                Ok((_connection, channel)) => {
                    if let Err(kind) = self.consume_loop(&channel, &handler, prefetch, &shutdown).await {
                        match kind {
                            LoopExit::ConnectionFamily(msg) => {
                                warn!(agent = %self.agent_name, error = %msg, "connection lost, reconnecting in 5s");
                                sleep(Duration::from_secs(5)).await;
                            }
                            LoopExit::Unexpected(msg) => {
                                error!(agent = %self.agent_name, error = %msg, "unexpected consumer error, retrying in 10s");
                                sleep(Duration::from_secs(10)).await;
                            }
                            LoopExit::Shutdown => return,
                        }
                    }
                }
                Err(err) => {
                    warn!(agent = %self.agent_name, error = %err.to_string(), "failed to connect, retrying in 5s");
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn connect_and_declare(&self) -> Result<(Connection, Channel), PublishError> {
        let connection = Connection::connect(&self.broker_url, ConnectionProperties::default())
            .await
            .map_err(|e| PublishError::Amqp(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| PublishError::Amqp(e.to_string()))?;

        let mut args = FieldTable::default();
        args.insert("x-message-ttl".into(), AMQPValue::LongInt(QUEUE_TTL_MS));
        args.insert("x-max-length".into(), AMQPValue::LongInt(QUEUE_MAX_LENGTH));
        args.insert("x-dead-letter-exchange".into(), AMQPValue::LongString("".into()));
        args.insert("x-dead-letter-routing-key".into(), AMQPValue::LongString(DLQ_NAME.into()));

        channel
            .queue_declare(
                &self.queue_name,
                QueueDeclareOptions { durable: true, ..Default::default() },
                args,
            )
            .await
            .map_err(|e| PublishError::Amqp(e.to_string()))?;

        for routing_key in &self.routing_keys {
            channel
                .queue_bind(
                    &self.queue_name,
                    "catalyst.events",
                    routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| PublishError::Amqp(e.to_string()))?;
        }

        Ok((connection, channel))
    }

    /// Republish a redelivery (bumped `attempt`) onto the exchange under its
    /// own routing key, so the next consume sees the incremented counter —
    /// AMQP's native nack-with-requeue redelivers the same body verbatim and
    /// can never advance `attempt` (§3.1).
    async fn republish_with_bumped_attempt(
        &self,
        channel: &Channel,
        event: &Event,
    ) -> Result<(), LoopExit> {
        let body = serde_json::to_vec(event)
            .map_err(|e| LoopExit::Unexpected(format!("failed to serialise redelivery: {e}")))?;
        let confirm = channel
            .basic_publish(
                EXCHANGE_NAME,
                &event.event_type.routing_key(),
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| LoopExit::Unexpected(e.to_string()))?;
        confirm.await.map_err(|e| LoopExit::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn consume_loop(
        &self,
        channel: &Channel,
        handler: &Handler,
        prefetch: u16,
        shutdown: &CancellationToken,
    ) -> Result<(), LoopExit> {
        channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| LoopExit::Unexpected(e.to_string()))?;

        let mut consumer = channel
            .basic_consume(
                &self.queue_name,
                &self.agent_name,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| LoopExit::Unexpected(e.to_string()))?;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => return Err(LoopExit::Shutdown),
                next = consumer.next() => {
                    let Some(delivery) = next else {
                        return Err(LoopExit::ConnectionFamily("consumer stream closed".to_string()));
                    };
                    let delivery = delivery.map_err(|e| LoopExit::ConnectionFamily(e.to_string()))?;

                    match serde_json::from_slice::<Event>(&delivery.data) {
                        Err(_) => {
                            // Malformed message: nack without requeue -> DLQ.
                            delivery
                                .nack(BasicNackOptions { requeue: false, ..Default::default() })
                                .await
                                .map_err(|e| LoopExit::Unexpected(e.to_string()))?;
                        }
                        Ok(event) => {
                            let attempt = event.attempt;
                            let redelivery = event.redelivery();
                            match handler(event).await {
                                HandlerResult::Ok => {
                                    delivery
                                        .ack(BasicAckOptions::default())
                                        .await
                                        .map_err(|e| LoopExit::Unexpected(e.to_string()))?;
                                }
                                HandlerResult::Retry if attempt < MAX_DELIVERY_ATTEMPTS => {
                                    // `attempt` lives in the message body, not in broker
                                    // redelivery metadata, so a bare nack+requeue would
                                    // never advance it (§3.1). Republish the bumped event
                                    // in its place and ack the original out of the queue.
                                    self.republish_with_bumped_attempt(channel, &redelivery).await?;
                                    delivery
                                        .ack(BasicAckOptions::default())
                                        .await
                                        .map_err(|e| LoopExit::Unexpected(e.to_string()))?;
                                }
                                HandlerResult::Retry | HandlerResult::Fatal => {
                                    delivery
                                        .nack(BasicNackOptions { requeue: false, ..Default::default() })
                                        .await
                                        .map_err(|e| LoopExit::Unexpected(e.to_string()))?;
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

enum LoopExit {
    ConnectionFamily(String),
    Unexpected(String),
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dlq_routing_targets_failed_events() {
        assert_eq!(DLQ_NAME, "failed-events");
    }

    #[test]
    fn max_delivery_attempts_is_three() {
        assert_eq!(MAX_DELIVERY_ATTEMPTS, 3);
    }
}
