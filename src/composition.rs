//! Composition root (Design Note §9: "expose explicit collaborators...a
//! single top-level composition root instantiates them once").

use std::sync::Arc;

use crate::adapters::amqp::EventPublisher as AmqpEventPublisher;
use crate::adapters::container::BollardRuntime;
use crate::adapters::llm::HttpLlmClient;
use crate::adapters::sqlite::connection::create_pool;
use crate::adapters::sqlite::migrations::Migrator;
use crate::adapters::sqlite::SqliteTaskStore;
use crate::domain::models::Config;
use crate::domain::ports::{ContainerRuntime, EventPublisher, LlmClient, TaskStore};
use crate::services::handlers::HandlerContext;
use crate::services::{Orchestrator, SandboxExecutor};

pub struct Composition {
    pub store: Arc<dyn TaskStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub handler_ctx: Arc<HandlerContext>,
    pub orchestrator: Arc<Orchestrator>,
    pub sandbox: Arc<SandboxExecutor>,
    pub config: Config,
}

impl Composition {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let pool = create_pool(&config.db_url, None).await?;
        Migrator::new(pool.clone()).run().await?;
        let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(pool));

        let publisher: Arc<dyn EventPublisher> =
            Arc::new(AmqpEventPublisher::new(config.broker_url.clone(), Some(Arc::clone(&store))));

        let container_runtime: Arc<dyn ContainerRuntime> =
            Arc::new(BollardRuntime::connect(config.sandbox.network.clone())?);
        let llm: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(&config.llm)?);

        let handler_ctx = Arc::new(HandlerContext::new(
            Arc::clone(&store),
            Arc::clone(&publisher),
            llm,
            container_runtime,
            config.clone(),
        ));
        let sandbox = Arc::clone(&handler_ctx.sandbox);

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&publisher),
            Arc::clone(&handler_ctx),
            config.clone(),
        ));

        Ok(Self { store, publisher, handler_ctx, orchestrator, sandbox, config })
    }
}
