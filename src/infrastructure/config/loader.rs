use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::{Config, Job, PATH_PLACEHOLDER};

/// Prefix of environment variables merged over the file.
pub const ENV_PREFIX: &str = "TROVILO_";

/// Configuration error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("No jobs configured")]
    NoJobs,

    #[error("Job name cannot be empty")]
    EmptyJobName,

    #[error("Duplicate job name: {0}")]
    DuplicateJobName(String),

    #[error("Job '{0}': target-dir cannot be empty")]
    EmptyTargetDir(String),

    #[error("Job '{job}': verify step '{step}' has an empty command")]
    EmptyVerifyCommand { job: String, step: String },

    #[error("Job '{job}': verify step '{step}' has no %s placeholder")]
    MissingPlaceholder { job: String, step: String },

    #[error("Job '{job}': post-deploy action '{action}' has an empty command")]
    EmptyPostDeployCommand { job: String, action: String },

    #[error("Job '{job}': invalid selector entry '{key}={value}'")]
    InvalidSelector {
        job: String,
        key: String,
        value: String,
    },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid max_consecutive_failures: 0. Must be at least 1")]
    InvalidFailureBudget,

    #[error("Invalid timeout_secs: 0. Must be at least 1")]
    InvalidTimeout,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `path`.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. The YAML file
    /// 3. Environment variables (`TROVILO_*`, `__` separates nesting levels)
    ///
    /// A file without a `jobs` list whose root carries a `name` is read as a
    /// single job.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        if config.jobs.is_empty() && figment.find_value("name").is_ok() {
            let job: Job = figment
                .extract()
                .with_context(|| format!("Failed to read job from {}", path.display()))?;
            config.jobs.push(job);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.jobs.is_empty() {
            return Err(ConfigError::NoJobs);
        }

        let mut names = HashSet::new();
        for job in &config.jobs {
            Self::validate_job(job)?;
            if !names.insert(job.name.as_str()) {
                return Err(ConfigError::DuplicateJobName(job.name.clone()));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.watch.initial_backoff_ms > config.watch.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.watch.initial_backoff_ms,
                config.watch.max_backoff_ms,
            ));
        }

        if config.watch.max_consecutive_failures == 0 {
            return Err(ConfigError::InvalidFailureBudget);
        }

        if config.commands.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    fn validate_job(job: &Job) -> Result<(), ConfigError> {
        if job.name.trim().is_empty() {
            return Err(ConfigError::EmptyJobName);
        }

        if job.target_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyTargetDir(job.name.clone()));
        }

        for (key, value) in &job.selector {
            if !is_selector_token(key) || !is_selector_token(value) {
                return Err(ConfigError::InvalidSelector {
                    job: job.name.clone(),
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }

        for step in &job.verify {
            if step.cmd.is_empty() {
                return Err(ConfigError::EmptyVerifyCommand {
                    job: job.name.clone(),
                    step: step.name.clone(),
                });
            }
            if !step.cmd.iter().any(|arg| arg.contains(PATH_PLACEHOLDER)) {
                return Err(ConfigError::MissingPlaceholder {
                    job: job.name.clone(),
                    step: step.name.clone(),
                });
            }
        }

        for action in &job.post_deploy {
            if action.cmd.is_empty() {
                return Err(ConfigError::EmptyPostDeployCommand {
                    job: job.name.clone(),
                    action: action.name.clone(),
                });
            }
        }

        Ok(())
    }
}

fn is_selector_token(token: &str) -> bool {
    !token.is_empty()
        && !token
            .chars()
            .any(|c| matches!(c, ',' | '=' | '!') || c.is_whitespace())
}
