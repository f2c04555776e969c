//! Port trait definitions (Hexagonal Architecture)
//!
//! - WatchSource: opens label-selected ConfigMap watches on the cluster
//!
//! The Kubernetes adapter lives in `adapters::kube`; tests supply
//! scripted sources.

pub mod watch_source;

pub use watch_source::{EventStream, WatchScope, WatchSource};
