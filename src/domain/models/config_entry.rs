use std::collections::BTreeMap;
use std::fmt;

/// Snapshot of one ConfigMap as observed on the watch stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigEntry {
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,

    /// Key is the file name, value its full content.
    pub data: BTreeMap<String, String>,

    /// Resource version the snapshot was taken at, when known.
    pub resource_version: Option<String>,
}

impl ConfigEntry {
    /// Create an entry without labels or resource version.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        data: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            data: data.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Data keys that cannot be used as a plain file name.
    pub fn unsafe_keys(&self) -> Vec<&str> {
        self.data
            .keys()
            .map(String::as_str)
            .filter(|key| !is_safe_file_name(key))
            .collect()
    }
}

impl fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A key is safe when it names a single path component inside the target directory.
pub fn is_safe_file_name(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains('/')
        && !key.contains('\\')
        && !key.contains('\0')
}

/// Kind of change reported by the watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Added,
    Modified,
    Deleted,
}

impl WatchEventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change delivered by a watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub entry: ConfigEntry,
}

impl WatchEvent {
    /// ADDED event for `entry`.
    pub fn added(entry: ConfigEntry) -> Self {
        Self {
            kind: WatchEventKind::Added,
            entry,
        }
    }

    /// MODIFIED event for `entry`.
    pub fn modified(entry: ConfigEntry) -> Self {
        Self {
            kind: WatchEventKind::Modified,
            entry,
        }
    }

    /// DELETED event for `entry`; carries the last known state.
    pub fn deleted(entry: ConfigEntry) -> Self {
        Self {
            kind: WatchEventKind::Deleted,
            entry,
        }
    }
}
