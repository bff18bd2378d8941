//! Event Publisher (§4.C): single, process-wide instance holding one broker
//! connection and channel. All publishes are serialised by an internal
//! mutex. Best-effort audit writes never fail the publish.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::warn;

use crate::adapters::amqp::topology::EXCHANGE_NAME;
use crate::domain::errors::PublishError;
use crate::domain::models::Event;
use crate::domain::ports::{EventPublisher as EventPublisherPort, TaskStore};

const MAX_PUBLISH_ATTEMPTS: u32 = 3;

struct Link {
    connection: Connection,
    channel: Channel,
}

pub struct EventPublisher {
    broker_url: String,
    link: Mutex<Option<Link>>,
    audit: Option<Arc<dyn TaskStore>>,
}

impl EventPublisher {
    pub fn new(broker_url: impl Into<String>, audit: Option<Arc<dyn TaskStore>>) -> Self {
        Self { broker_url: broker_url.into(), link: Mutex::new(None), audit }
    }

    async fn connect(&self) -> Result<Link, PublishError> {
        let connection = Connection::connect(&self.broker_url, ConnectionProperties::default())
            .await
            .map_err(|e| PublishError::Amqp(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| PublishError::Amqp(e.to_string()))?;
        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| PublishError::Amqp(e.to_string()))?;
        Ok(Link { connection, channel })
    }

    /// Lightweight liveness check: an open connection with an open channel.
    fn is_live(link: &Link) -> bool {
        link.connection.status().connected() && link.channel.status().connected()
    }

    async fn ensure_connected(&self) -> Result<(), PublishError> {
        let mut guard = self.link.lock().await;
        let needs_reconnect = match guard.as_ref() {
            Some(link) => !Self::is_live(link),
            None => true,
        };
        if needs_reconnect {
            *guard = Some(self.connect().await?);
        }
        Ok(())
    }

    fn spawn_audit_write(&self, event: Event) {
        let Some(store) = self.audit.clone() else { return };
        tokio::spawn(async move {
            if let Err(err) = store.record_event(&event).await {
                warn!(event_id = %event.event_id, error = %err, "best-effort audit write failed");
            }
        });
    }
}

#[async_trait]
impl EventPublisherPort for EventPublisher {
    async fn health_check(&self) -> bool {
        if self.ensure_connected().await.is_err() {
            return false;
        }
        self.link.lock().await.as_ref().is_some_and(Self::is_live)
    }

    async fn publish(&self, event: &Event) -> Result<(), PublishError> {
        self.ensure_connected().await?;

        let body = serde_json::to_vec(event).map_err(|e| PublishError::Serialization(e.to_string()))?;
        let routing_key = event.event_type.routing_key();

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let publish_result = {
                let guard = self.link.lock().await;
                let link = guard.as_ref().expect("connection ensured above");
                link.channel
                    .basic_publish(
                        EXCHANGE_NAME,
                        &routing_key,
                        BasicPublishOptions::default(),
                        &body,
                        BasicProperties::default().with_delivery_mode(2),
                    )
                    .await
            };

            match publish_result {
                Ok(confirm) => {
                    confirm
                        .await
                        .map_err(|e| PublishError::Amqp(e.to_string()))?;
                    self.spawn_audit_write(event.clone());
                    return Ok(());
                }
                Err(err) if PublishError::is_connection_family(&err.to_string()) => {
                    {
                        let mut guard = self.link.lock().await;
                        *guard = None;
                    }
                    if attempt >= MAX_PUBLISH_ATTEMPTS {
                        return Err(PublishError::RetriesExhausted {
                            attempts: attempt,
                            reason: err.to_string(),
                        });
                    }
                    sleep(std::time::Duration::from_millis(500 * u64::from(attempt))).await;
                    self.ensure_connected().await?;
                }
                Err(err) => return Err(PublishError::Amqp(err.to_string())),
            }
        }
    }
}
