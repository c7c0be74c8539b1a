//! # CPMM Configuration
//!
//! Layered configuration for embedding the pool engine: logging, event
//! history and clock selection. Values come from an optional TOML file and are
//! overridden by `CPMM__`-prefixed environment variables.
//!
//! Contract constants (fee, minimum liquidity, fixed-point scales) are part of
//! the engine and deliberately absent from this crate.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cpmm_config::{init_tracing, EngineConfig};
//!
//! let config = EngineConfig::load(Some(std::path::Path::new("config/engine.toml")))?;
//! init_tracing(&config.logging)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod engine_config;
pub mod telemetry;

// Re-export commonly used types
pub use engine_config::{ClockConfig, ClockSource, EngineConfig, EventsConfig, LoggingConfig};
pub use telemetry::{init_tracing, LogFormat};
