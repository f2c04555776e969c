//! Kubernetes adapter.
//!
//! Builds a `kube` client from an explicit kubeconfig or the ambient
//! configuration, and implements the `WatchSource` port over ConfigMaps.

pub mod client;
pub mod watch_source;

pub use client::{build_client, check_connectivity};
pub use watch_source::KubeWatchSource;
