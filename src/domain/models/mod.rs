//! Domain models for ConfigMap mirroring.

pub mod config;
pub mod config_entry;
pub mod job;

pub use config::{CommandConfig, Config, LogFormat, LoggingConfig, RotationPolicy, WatchConfig};
pub use config_entry::{is_safe_file_name, ConfigEntry, WatchEvent, WatchEventKind};
pub use job::{Job, PostDeployAction, VerifyStep, PATH_PLACEHOLDER};
