//! Engine Configuration Module
//!
//! Provides configuration loading for the pool engine.
//! Supports loading from TOML files with environment variable overrides.

use crate::telemetry::{self, LogFormat};
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location probed when no explicit path is given
pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";

/// Prefix for environment overrides (`CPMM__EVENTS__HISTORY_CAPACITY=64`)
pub const ENV_PREFIX: &str = "CPMM";

/// Upper bound on the in-memory event history
pub const MAX_HISTORY_CAPACITY: usize = 1_000_000;

/// Main engine configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Log filter and output format
    pub logging: LoggingConfig,

    /// Domain event publication
    pub events: EventsConfig,

    /// Timestamp source for the price accumulator
    pub clock: ClockConfig,
}

/// Logging settings consumed by [`telemetry::init_tracing`]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    pub level: String,
    pub format: LogFormat,
    pub with_target: bool,
}

/// Event settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    /// Number of events retained in memory; 0 disables the history
    pub history_capacity: usize,
    /// Publish every event as a tracing record
    pub trace_events: bool,
}

/// Where timestamps come from
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    #[default]
    System,
    Manual,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ClockConfig {
    pub source: ClockSource,
    /// Initial reading of the manual clock, in seconds
    pub start_timestamp: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_target: true,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1024,
            trace_events: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file with `CPMM__` environment overrides.
    ///
    /// An explicit `path` must exist; without one, [`DEFAULT_CONFIG_PATH`] is
    /// used when present and defaults apply otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    fn load_with_env_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => {
                info!("Loading engine config: {:?}", path);
                builder.add_source(File::from(path).required(true))
            }
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                debug!("Probing default engine config: {:?}", default);
                builder.add_source(File::from(default).required(false))
            }
        };

        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder
            .build()
            .context("Failed to build engine configuration")?
            .try_deserialize()
            .context("Failed to deserialize engine configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from an in-memory TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .context("Failed to build engine configuration")?
            .try_deserialize()
            .context("Failed to deserialize engine configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        telemetry::parse_filter(&self.logging.level)
            .with_context(|| format!("Invalid log level directive '{}'", self.logging.level))?;

        if self.events.history_capacity > MAX_HISTORY_CAPACITY {
            bail!(
                "events.history_capacity {} exceeds maximum {}",
                self.events.history_capacity,
                MAX_HISTORY_CAPACITY
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let config = EngineConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.events.history_capacity, 1024);
        assert!(config.events.trace_events);
        assert_eq!(config.clock.source, ClockSource::System);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("engine.toml");

        let config_content = r#"
[logging]
level = "cpmm_engine=debug"
format = "json"

[events]
history_capacity = 16
trace_events = false

[clock]
source = "manual"
start_timestamp = 1700000000
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = EngineConfig::load(Some(&config_path)).unwrap();

        assert_eq!(config.logging.level, "cpmm_engine=debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.logging.with_target);
        assert_eq!(config.events.history_capacity, 16);
        assert!(!config.events.trace_events);
        assert_eq!(config.clock.source, ClockSource::Manual);
        assert_eq!(config.clock.start_timestamp, 1_700_000_000);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        assert!(EngineConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_environment_override() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("engine.toml");
        fs::write(&config_path, "[events]\nhistory_capacity = 8\n").unwrap();

        std::env::set_var("CPMMTEST__EVENTS__HISTORY_CAPACITY", "77");
        let config = EngineConfig::load_with_env_prefix(Some(&config_path), "CPMMTEST").unwrap();
        std::env::remove_var("CPMMTEST__EVENTS__HISTORY_CAPACITY");

        assert_eq!(config.events.history_capacity, 77);
    }

    #[test]
    fn test_rejects_oversized_history() {
        let result = EngineConfig::from_toml_str("[events]\nhistory_capacity = 2000000\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_format() {
        let result = EngineConfig::from_toml_str("[logging]\nformat = \"xml\"\n");
        assert!(result.is_err());
    }
}
