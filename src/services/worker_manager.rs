//! Worker Manager (§4.F): supervises one Worker per agent kind, each in its
//! own scheduling unit so a slow handler cannot block another agent.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::amqp::consumer::Handler;
use crate::domain::models::{Event, EventType, HandlerResult};
use crate::services::handlers::{self, HandlerContext};
use crate::services::worker::AgentWorker;

const STOP_GRACE: Duration = Duration::from_secs(30);

/// `(agent_name, queue_name, event_type)` for every worker the manager owns.
const AGENTS: &[(&str, &str, EventType)] = &[
    ("planner", "planner-queue", EventType::TaskInitiated),
    ("architect", "architect-queue", EventType::PlanCreated),
    ("coder", "coder-queue", EventType::ArchitectureProposed),
    ("tester", "tester-queue", EventType::CodePrOpened),
    ("reviewer", "reviewer-queue", EventType::TestResults),
    ("deployer", "deployer-queue", EventType::ReviewDecision),
];

pub struct WorkerManager {
    broker_url: String,
    shutdown: CancellationToken,
    join_handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new(broker_url: impl Into<String>) -> Self {
        Self { broker_url: broker_url.into(), shutdown: CancellationToken::new(), join_handles: Vec::new() }
    }

    pub fn start_all(&mut self, ctx: &Arc<HandlerContext>) {
        let dispatch: Vec<(EventType, _)> = handlers::dispatch_table();

        for &(agent_name, queue_name, event_type) in AGENTS {
            let handler_fn = dispatch
                .iter()
                .find(|(ty, _)| *ty == event_type)
                .map(|(_, f)| *f)
                .expect("every agent kind has a dispatch entry");

            let handler: Handler = make_handler(Arc::clone(ctx), handler_fn);
            let worker = AgentWorker::new(
                agent_name,
                queue_name,
                vec![event_type.routing_key()],
                self.broker_url.clone(),
                handler,
            );
            let shutdown = self.shutdown.clone();

            info!(agent = agent_name, queue = queue_name, "starting worker");
            self.join_handles.push(tokio::spawn(async move {
                worker.run(shutdown).await;
            }));
        }
    }

    pub async fn stop_all(&mut self) {
        self.shutdown.cancel();
        let deadline = tokio::time::sleep(STOP_GRACE);
        tokio::pin!(deadline);

        for handle in self.join_handles.drain(..) {
            tokio::select! {
                result = handle => {
                    if let Err(err) = result {
                        warn!(error = %err, "worker task panicked during shutdown");
                    }
                }
                () = &mut deadline => {
                    warn!("worker did not drain within the stop grace period");
                }
            }
        }
    }
}

fn make_handler(
    ctx: Arc<HandlerContext>,
    handler_fn: handlers::HandlerFn,
) -> Handler {
    Arc::new(move |event: Event| {
        let ctx = Arc::clone(&ctx);
        Box::pin(async move { handler_fn(ctx, event).await }) as std::pin::Pin<Box<dyn std::future::Future<Output = HandlerResult> + Send>>
    })
}
