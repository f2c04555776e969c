//! CLI type definitions
//!
//! This module contains the clap structure that defines the CLI interface.

use clap::Parser;
use std::path::PathBuf;

use crate::domain::models::{LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(name = "trovilo")]
#[command(about = "Mirror labelled Kubernetes ConfigMaps onto the local filesystem", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "TROVILO_CONFIG")]
    pub config: PathBuf,

    /// Path to a kubeconfig file (in-cluster or default configuration when omitted)
    #[arg(long, env = "TROVILO_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, env = "TROVILO_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Validate the configuration, print the effective jobs and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    /// Apply command-line logging flags over the file's `logging` section.
    pub fn apply_logging_overrides(&self, logging: &mut LoggingConfig) {
        if let Some(level) = &self.log_level {
            logging.level.clone_from(level);
        }
        if self.log_json {
            logging.format = LogFormat::Json;
        }
    }
}
