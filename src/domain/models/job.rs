use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Placeholder substituted with the path of the file under verification.
pub const PATH_PLACEHOLDER: &str = "%s";

/// One named validation command run against every data key of a ConfigMap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyStep {
    pub name: String,

    /// Argument vector; one token carries the `%s` placeholder.
    pub cmd: Vec<String>,
}

/// One named command run after files were written or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDeployAction {
    pub name: String,
    pub cmd: Vec<String>,
}

/// A watch target: which ConfigMaps to mirror, where, and what to run around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    pub name: String,

    /// Namespace to watch; empty watches all namespaces.
    #[serde(default)]
    pub namespace: String,

    /// Exact-match label constraints, combined with AND.
    #[serde(default)]
    pub selector: BTreeMap<String, String>,

    #[serde(default)]
    pub verify: Vec<VerifyStep>,

    pub target_dir: PathBuf,

    /// Write every key directly into `target_dir`, dropping namespace and name.
    #[serde(default)]
    pub flatten: bool,

    #[serde(default)]
    pub post_deploy: Vec<PostDeployAction>,
}

impl Job {
    /// Label selector in API form, e.g. `app=prometheus,type=alerts`.
    pub fn label_selector(&self) -> String {
        self.selector
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Namespace scope of the watch, `None` for cluster-wide.
    pub fn namespace_scope(&self) -> Option<&str> {
        let namespace = self.namespace.trim();
        if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        }
    }
}
