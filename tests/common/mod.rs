//! Common test utilities for integration tests
//!
//! Provides shared fixtures for jobs, ConfigMap snapshots and shell commands
//! used across multiple integration test files.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use trovilo::domain::models::{ConfigEntry, Job, PostDeployAction, VerifyStep};
use trovilo::services::{CommandRunner, Reconciler};

/// Create a temporary directory for test isolation
///
/// Returns a TempDir that will be cleaned up when dropped.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Job watching `monitoring` with a single selector label.
pub fn job(target_dir: &Path, flatten: bool) -> Job {
    Job {
        name: "alert-rules".to_string(),
        namespace: "monitoring".to_string(),
        selector: BTreeMap::from([("type".to_string(), "prometheus-alerts".to_string())]),
        verify: vec![],
        target_dir: target_dir.to_path_buf(),
        flatten,
        post_deploy: vec![],
    }
}

pub fn entry(namespace: &str, name: &str, data: &[(&str, &str)]) -> ConfigEntry {
    ConfigEntry::new(
        namespace,
        name,
        data.iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string())),
    )
}

/// Argument vector running `script` through `sh -c` with `args` as `$0..`.
pub fn sh(script: &str, args: &[&str]) -> Vec<String> {
    ["sh", "-c", script]
        .iter()
        .chain(args)
        .map(|arg| (*arg).to_string())
        .collect()
}

/// Verify step accepting files that start with `groups:`, like a rule checker.
pub fn rule_check() -> VerifyStep {
    VerifyStep {
        name: "verify alert rule validity".to_string(),
        cmd: sh("grep -q '^groups:' \"$0\"", &["%s"]),
    }
}

/// Post-deploy action appending `label` to `log`.
pub fn record(name: &str, log: &Path, label: &str) -> PostDeployAction {
    PostDeployAction {
        name: name.to_string(),
        cmd: sh(
            "echo \"$1\" >> \"$0\"",
            &[log.to_str().expect("utf-8 temp path"), label],
        ),
    }
}

/// Lines appended to `log` so far.
pub fn recorded(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn reconciler(job: Job) -> Reconciler {
    Reconciler::new(job, CommandRunner::new(Duration::from_secs(10)))
}

pub fn read(path: impl Into<PathBuf>) -> String {
    std::fs::read_to_string(path.into()).expect("file should exist")
}
