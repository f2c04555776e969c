//! Error types for the reconciliation engine.
//!
//! Components return these to the reconciliation loop, which alone decides
//! whether a failure is fatal, skipped or logged and ignored.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure reported by an open watch stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The resource version the watch resumed from is no longer available.
    #[error("watch resource version expired: {0}")]
    Expired(String),

    #[error("API server returned error {code}: {message}")]
    Api { code: u16, message: String },

    #[error("watch transport error: {0}")]
    Transport(String),
}

impl StreamError {
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired(_))
    }
}

/// The watch could not be established.
#[derive(Debug, Error)]
#[error("failed to open ConfigMap watch on {scope}: {message}")]
pub struct WatchOpenError {
    pub scope: String,
    pub message: String,
}

/// Errors that end a watch session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Open(#[from] WatchOpenError),

    #[error("watch for job '{job}' failed {failures} times in a row, giving up: {last_error}")]
    ReconnectExhausted {
        job: String,
        failures: u32,
        last_error: String,
    },
}

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command is empty")]
    Empty,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

/// Why a ConfigMap was rejected by verification.
#[derive(Debug, Error)]
pub enum VerificationFailure {
    #[error("failed to prepare '{key}' for verification: {source}")]
    Prepare {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("verify step '{step}' rejected '{key}': {reason}")]
    Rejected {
        step: String,
        key: String,
        reason: String,
        /// Keys that passed every step run before the failure.
        verified: Vec<String>,
        /// Combined stdout and stderr of the failing command.
        output: String,
    },
}

impl VerificationFailure {
    /// Captured output of the last command, empty if none ran.
    pub fn output(&self) -> &str {
        match self {
            Self::Prepare { .. } => "",
            Self::Rejected { output, .. } => output,
        }
    }

    pub fn verified(&self) -> &[String] {
        match self {
            Self::Prepare { .. } => &[],
            Self::Rejected { verified, .. } => verified,
        }
    }
}

/// Filesystem errors raised while mirroring a ConfigMap.
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("ConfigMap {entry} has key '{key}' that is not a valid file name")]
    UnsafeKey { entry: String, key: String },

    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move staged file into '{path}': {source}")]
    ReplaceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A registrar operation that stopped partway.
#[derive(Debug, Error)]
#[error("{source} ({} path(s) already changed)", .completed.len())]
pub struct PartialFailure {
    /// Paths that were written or removed before the error.
    pub completed: Vec<PathBuf>,
    pub source: RegistrarError,
}

impl From<RegistrarError> for PartialFailure {
    fn from(source: RegistrarError) -> Self {
        Self {
            completed: Vec::new(),
            source,
        }
    }
}

/// Fatal errors that stop a job's reconciliation loop.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to register ConfigMap {entry}: {source}")]
    Register {
        entry: String,
        #[source]
        source: PartialFailure,
    },

    #[error("failed to remove ConfigMap {entry}: {source}")]
    Remove {
        entry: String,
        #[source]
        source: PartialFailure,
    },

    #[error(transparent)]
    Watch(#[from] SessionError),
}
