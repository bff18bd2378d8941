//! Structured logging init, matching the teacher's `LoggerImpl` shape:
//! an `EnvFilter` layered with a JSON or plain formatter selected by
//! `LogFormat`.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::models::LogFormat;

pub struct LoggerImpl;

impl LoggerImpl {
    pub fn init(log_level: &str, format: LogFormat) -> Result<Self> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(
                log_level
                    .parse()
                    .context("invalid log level; expected trace|debug|info|warn|error")?,
            )
            .from_env_lossy();

        match format {
            LogFormat::Json => {
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_filter(env_filter);
                tracing_subscriber::registry().with(layer).init();
            }
            LogFormat::Plain => {
                let layer = tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_filter(env_filter);
                tracing_subscriber::registry().with(layer).init();
            }
        }

        Ok(Self)
    }
}
