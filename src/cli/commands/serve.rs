//! `catalyst serve`: bootstrap topology, start all agent workers, and serve
//! the REST API — the full event-driven deployment in one process.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::adapters::amqp::TopologyInitialiser;
use crate::api::build_router;
use crate::composition::Composition;
use crate::domain::models::Mode;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LoggerImpl;
use crate::services::{EnvironmentDetector, WorkerManager};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind address for the REST surface.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen: String,
}

/// Serves the REST API in either mode: event-driven also bootstraps the
/// broker topology and starts the agent workers; sequential serves the
/// same routes with `ExecuteTask` running the handler chain in-process.
pub async fn run(args: ServeArgs) -> Result<()> {
    let detected = EnvironmentDetector::detect();
    let config = ConfigLoader::load(detected)?;
    let _logger = LoggerImpl::init(&config.log_level, config.log_format)?;

    let mut workers = if config.mode == Mode::EventDriven {
        info!(broker = %config.broker_url, "initialising broker topology");
        TopologyInitialiser::initialise(&config.broker_url)
            .await
            .context("topology initialisation failed; refusing to start in event_driven mode")?;
        Some(WorkerManager::new(config.broker_url.clone()))
    } else {
        info!("no broker in sequential mode; serving REST API with in-process handler execution");
        None
    };

    let composition = Composition::build(config.clone()).await?;

    if let Some(workers) = workers.as_mut() {
        workers.start_all(&composition.handler_ctx);
    }

    let state = crate::api::AppState {
        store: composition.store.clone(),
        publisher: composition.publisher.clone(),
        orchestrator: composition.orchestrator.clone(),
        sandbox: composition.sandbox.clone(),
        config: composition.config.clone(),
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!(addr = %args.listen, "serving REST API");

    let serve_result = axum::serve(listener, router).await;

    if let Some(mut workers) = workers {
        workers.stop_all().await;
    }
    serve_result.context("REST server exited with an error")
}
