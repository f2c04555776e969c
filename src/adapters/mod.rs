//! Adapters implementing domain ports.

pub mod kube;
pub mod scripted;

pub use self::kube::KubeWatchSource;
pub use scripted::{ScriptedOpen, ScriptedWatchSource};
