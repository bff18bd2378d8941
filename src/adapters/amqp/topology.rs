//! Topology Initialiser (§4.B): declares the exchange, per-agent queues, the
//! dead-letter queue, and their bindings, bit-exact to §6.3. Idempotent —
//! re-declaring with identical arguments is a no-op; mismatched arguments
//! surface as a fatal error.

use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Connection, ConnectionProperties, ExchangeKind};
use std::time::Duration;

use crate::domain::errors::TopologyError;
use crate::domain::models::EventType;

pub const EXCHANGE_NAME: &str = "catalyst.events";
pub const DLQ_NAME: &str = "failed-events";
const QUEUE_TTL_MS: i32 = 3_600_000;
const QUEUE_MAX_LENGTH: i32 = 10_000;

const AGENT_QUEUES: &[&str] = &[
    "planner-queue",
    "architect-queue",
    "coder-queue",
    "tester-queue",
    "reviewer-queue",
    "deployer-queue",
    "explorer-queue",
    "orchestrator-queue",
];

/// `(queue, routing_key)` bindings per §6.3. `orchestrator-queue` binds only
/// the wildcard `catalyst.*.complete` — deploy failure is detected by the
/// orchestrator's own timeout, not by consuming `deploy.failed` (§4.H).
fn bindings() -> Vec<(&'static str, String)> {
    vec![
        ("planner-queue", EventType::TaskInitiated.routing_key()),
        ("architect-queue", EventType::PlanCreated.routing_key()),
        ("coder-queue", EventType::ArchitectureProposed.routing_key()),
        ("tester-queue", EventType::CodePrOpened.routing_key()),
        ("reviewer-queue", EventType::TestResults.routing_key()),
        ("deployer-queue", EventType::ReviewDecision.routing_key()),
        ("explorer-queue", EventType::ExplorerScanRequest.routing_key()),
        ("orchestrator-queue", "catalyst.*.complete".to_string()),
    ]
}

pub struct TopologyInitialiser;

impl TopologyInitialiser {
    /// Connect with exponential backoff (up to 10 attempts, 2-20s between),
    /// declare the full topology, then close the connection cleanly.
    pub async fn initialise(broker_url: &str) -> Result<(), TopologyError> {
        let connection = Self::connect_with_backoff(broker_url).await?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| TopologyError::Amqp(e.to_string()))?;

        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| TopologyError::Amqp(e.to_string()))?;

        for queue in AGENT_QUEUES {
            declare_agent_queue(&channel, queue).await?;
        }
        declare_dlq(&channel).await?;

        for (queue, routing_key) in bindings() {
            channel
                .queue_bind(
                    queue,
                    EXCHANGE_NAME,
                    &routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| TopologyError::Amqp(e.to_string()))?;
        }

        connection
            .close(200, "topology initialised")
            .await
            .map_err(|e| TopologyError::Amqp(e.to_string()))?;
        Ok(())
    }

    async fn connect_with_backoff(broker_url: &str) -> Result<Connection, TopologyError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(2))
            .with_max_interval(Duration::from_secs(20))
            .with_max_elapsed_time(None)
            .build();

        let mut attempts = 0u32;
        retry(policy, || {
            attempts += 1;
            let broker_url = broker_url.to_string();
            async move {
                if attempts > 10 {
                    return Err(backoff::Error::permanent(TopologyError::ConnectFailed {
                        attempts,
                        reason: "attempt budget exhausted".to_string(),
                    }));
                }
                Connection::connect(&broker_url, ConnectionProperties::default())
                    .await
                    .map_err(|e| backoff::Error::transient(TopologyError::Amqp(e.to_string())))
            }
        })
        .await
    }
}

/// Declare one agent's durable, per-message-ack queue with TTL and
/// max-length arguments, and route its dead-lettered messages to the DLQ.
async fn declare_agent_queue(channel: &lapin::Channel, name: &str) -> Result<(), TopologyError> {
    let mut args = FieldTable::default();
    args.insert("x-message-ttl".into(), AMQPValue::LongInt(QUEUE_TTL_MS));
    args.insert("x-max-length".into(), AMQPValue::LongInt(QUEUE_MAX_LENGTH));
    args.insert(
        "x-dead-letter-exchange".into(),
        AMQPValue::LongString("".into()),
    );
    args.insert(
        "x-dead-letter-routing-key".into(),
        AMQPValue::LongString(DLQ_NAME.into()),
    );

    channel
        .queue_declare(
            name,
            QueueDeclareOptions { durable: true, ..Default::default() },
            args,
        )
        .await
        .map_err(|e| TopologyError::Amqp(e.to_string()))?;
    Ok(())
}

/// DLQ: durable, no TTL, terminal destination for exhausted-retry messages.
async fn declare_dlq(channel: &lapin::Channel) -> Result<(), TopologyError> {
    channel
        .queue_declare(
            DLQ_NAME,
            QueueDeclareOptions { durable: true, ..Default::default() },
            FieldTable::default(),
        )
        .await
        .map_err(|e| TopologyError::Amqp(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_cover_every_agent_queue_except_failed_events() {
        let bound_queues: std::collections::HashSet<_> =
            bindings().into_iter().map(|(q, _)| q).collect();
        for queue in AGENT_QUEUES {
            assert!(bound_queues.contains(queue), "{queue} should have a binding");
        }
    }

    #[test]
    fn orchestrator_queue_binds_wildcard_complete() {
        assert!(bindings()
            .iter()
            .any(|(q, rk)| *q == "orchestrator-queue" && rk == "catalyst.*.complete"));
    }
}
