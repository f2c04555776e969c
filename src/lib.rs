//! trovilo - mirror Kubernetes ConfigMaps onto the local filesystem
//!
//! trovilo watches ConfigMaps matching a label selector and writes their data
//! keys as files, so processes that only read configuration from disk can be
//! configured through the cluster. Content can be verified before it is
//! written and follow-up commands run after every change.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Jobs, ConfigMap snapshots, errors and the watch port
//! - **Service Layer** (`services`): Watch sessions, verification, file registration, reconciliation
//! - **Application Layer** (`application`): Supervision of concurrently running jobs
//! - **Adapters** (`adapters`): Kubernetes and scripted implementations of the watch port
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use trovilo::adapters::kube::{build_client, KubeWatchSource};
//! use trovilo::application::JobSupervisor;
//! use trovilo::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load_from_file("trovilo.yaml")?;
//!     let client = build_client(None).await?;
//!     JobSupervisor::from_config(KubeWatchSource::new(client), &config)
//!         .run(config.jobs.clone())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{JobSupervisor, SupervisorError};
pub use domain::models::{
    CommandConfig, Config, ConfigEntry, Job, LoggingConfig, PostDeployAction, VerifyStep,
    WatchConfig, WatchEvent, WatchEventKind,
};
pub use domain::ports::{WatchScope, WatchSource};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{EventOutcome, FileRegistrar, Reconciler, WatchSession};
