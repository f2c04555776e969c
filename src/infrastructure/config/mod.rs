//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - Programmatic defaults
//! - YAML file loading, including the single-job legacy layout
//! - `TROVILO_*` environment variable overrides
//! - Validation of jobs and runtime settings

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, ENV_PREFIX};
