//! Domain layer for trovilo
//!
//! This module contains the watch targets, the ConfigMap snapshots observed
//! on the cluster, error types and the ports the services depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    CommandError, ReconcileError, RegistrarError, SessionError, StreamError,
    VerificationFailure, WatchOpenError,
};
