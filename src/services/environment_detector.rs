//! Decides deployment mode before any other component starts. Deterministic,
//! no network calls — only filesystem metadata probes and environment
//! variable reads.

use std::path::Path;

use crate::domain::models::{Config, Mode};

pub struct EnvironmentDetector;

impl EnvironmentDetector {
    /// Priority order: explicit `MODE` env var, then platform-injected
    /// credential files (managed platform → sequential), then a
    /// project-local container-orchestration marker or a container-runtime
    /// socket (either → `event_driven`), else sequential.
    pub fn detect() -> Config {
        let mode = std::env::var("MODE")
            .ok()
            .as_deref()
            .and_then(Mode::from_str)
            .unwrap_or_else(Self::infer_mode);

        Config { mode, ..Config::default() }
    }

    fn infer_mode() -> Mode {
        if Self::has_platform_credentials() {
            return Mode::Sequential;
        }
        if Self::has_orchestration_marker() || Self::has_container_socket() {
            return Mode::EventDriven;
        }
        Mode::Sequential
    }

    fn has_platform_credentials() -> bool {
        Path::new("/var/run/secrets").exists() || std::env::var("DATABASE_URL").is_ok()
    }

    fn has_orchestration_marker() -> bool {
        Path::new("docker-compose.yml").exists() || Path::new("Procfile").exists()
    }

    fn has_container_socket() -> bool {
        Path::new("/var/run/docker.sock").exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_env::with_vars;

    #[test]
    fn explicit_mode_env_var_wins() {
        with_vars(
            [("MODE", Some("event_driven")), ("DATABASE_URL", None)],
            || {
                assert_eq!(EnvironmentDetector::detect().mode, Mode::EventDriven);
            },
        );
    }

    #[test]
    fn platform_credentials_select_sequential_even_with_marker() {
        with_vars(
            [("MODE", None), ("DATABASE_URL", Some("postgres://x"))],
            || {
                assert_eq!(EnvironmentDetector::detect().mode, Mode::Sequential);
            },
        );
    }

    #[test]
    fn default_with_no_signals_is_sequential() {
        with_vars([("MODE", None::<&str>), ("DATABASE_URL", None::<&str>)], || {
            if !Path::new("/var/run/docker.sock").exists()
                && !Path::new("docker-compose.yml").exists()
                && !Path::new("Procfile").exists()
            {
                assert_eq!(EnvironmentDetector::detect().mode, Mode::Sequential);
            }
        });
    }
}
