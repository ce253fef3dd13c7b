//! Runtime configuration.
//!
//! This module provides strongly-typed configuration for the editor core,
//! loaded via the `config` crate from environment variables. The discovery
//! and polling knobs default to the values the product shipped with; slower
//! backends can raise them per deployment.

use crate::orchestrator::OrchestratorConfig;
use serde::Deserialize;
use std::time::Duration;

/// Editor configuration composed from per-component settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditorConfig {
    /// Execution orchestrator settings.
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
}

/// Orchestrator-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSettings {
    /// Seconds between discovery/tracking polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum discovery attempts before giving up.
    #[serde(default = "default_discovery_attempts")]
    pub discovery_attempts: u32,

    /// Recency window, in seconds, for accepting a discovered execution.
    #[serde(default = "default_discovery_window_secs")]
    pub discovery_window_secs: i64,
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_discovery_attempts() -> u32 {
    10
}

fn default_discovery_window_secs() -> i64 {
    30
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            discovery_attempts: default_discovery_attempts(),
            discovery_window_secs: default_discovery_window_secs(),
        }
    }
}

impl From<OrchestratorSettings> for OrchestratorConfig {
    fn from(settings: OrchestratorSettings) -> Self {
        Self {
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            discovery_attempts: settings.discovery_attempts,
            discovery_window: chrono::Duration::seconds(settings.discovery_window_secs),
        }
    }
}

impl EditorConfig {
    /// Loads configuration from environment variables.
    ///
    /// Variables use the `FLOWLOOM` prefix with `__` as the nesting
    /// separator, e.g. `FLOWLOOM_ORCHESTRATOR__DISCOVERY_ATTEMPTS=20`.
    ///
    /// # Errors
    ///
    /// Returns an error if present configuration values are invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("FLOWLOOM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
