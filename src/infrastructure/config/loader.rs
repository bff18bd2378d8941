//! Hierarchical configuration loading (§6.5): defaults, overridden by an
//! optional project file, overridden by `CATALYST_`-prefixed environment
//! variables — the Environment Detector decides `mode`, this layer decides
//! everything else.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log format: {0}. must be json or plain")]
    InvalidLogFormat(String),
    #[error("broker_url must not be empty")]
    EmptyBrokerUrl,
    #[error("db_url must not be empty")]
    EmptyDbUrl,
    #[error("sandbox memory_limit_mb must be at least 64")]
    InvalidMemoryLimit(u64),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Precedence (lowest to highest): programmatic defaults (seeded with
    /// the mode the Environment Detector already picked) -> `catalyst.yaml`
    /// in the working directory, if present -> `CATALYST_*` env vars.
    pub fn load(detected: Config) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(detected))
            .merge(Yaml::file("catalyst.yaml"))
            .merge(Env::prefixed("CATALYST_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.broker_url.trim().is_empty() {
            return Err(ConfigError::EmptyBrokerUrl);
        }
        if config.db_url.trim().is_empty() {
            return Err(ConfigError::EmptyDbUrl);
        }
        if config.sandbox.memory_limit_mb < 64 {
            return Err(ConfigError::InvalidMemoryLimit(config.sandbox.memory_limit_mb));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_env::with_var;

    #[test]
    fn defaults_pass_validation_unchanged() {
        let config = ConfigLoader::load(Config::default()).unwrap();
        assert_eq!(config.broker_url, Config::default().broker_url);
    }

    #[test]
    fn env_override_wins_over_defaults() {
        with_var("CATALYST_LOG_LEVEL", Some("debug"), || {
            let config = ConfigLoader::load(Config::default()).unwrap();
            assert_eq!(config.log_level, "debug");
        });
    }

    #[test]
    fn rejects_empty_broker_url() {
        let config = Config { broker_url: String::new(), ..Config::default() };
        assert!(ConfigLoader::load(config).is_err());
    }
}
