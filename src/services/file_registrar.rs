//! Mirrors ConfigMap data keys as files under a job's target directory.
//!
//! The set of files belonging to a ConfigMap is derived from the ConfigMap
//! itself (see [`paths_for`]); nothing is tracked between events.
//!
//! Writes are staged: every key is first written to a temporary file next to
//! its destination, and only once all of them are on disk are they renamed
//! into place. A failure while staging leaves the previous files untouched.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::errors::{PartialFailure, RegistrarError};
use crate::domain::models::{is_safe_file_name, ConfigEntry, Job};

#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Paths the entry's keys map to.
///
/// Flattened: `target_dir/<key>`. Nested: `target_dir/<namespace>/<name>/<key>`.
/// With `flatten`, keys shared by several ConfigMaps overwrite each other.
pub fn paths_for(entry: &ConfigEntry, target_dir: &Path, flatten: bool) -> BTreeSet<PathBuf> {
    let dir = entry_dir(entry, target_dir, flatten);
    entry.data.keys().map(|key| dir.join(key)).collect()
}

fn entry_dir(entry: &ConfigEntry, target_dir: &Path, flatten: bool) -> PathBuf {
    if flatten {
        target_dir.to_path_buf()
    } else {
        target_dir.join(&entry.namespace).join(&entry.name)
    }
}

/// Writes and removes the files of ConfigMaps for one target directory.
#[derive(Debug, Clone)]
pub struct FileRegistrar {
    target_dir: PathBuf,
    flatten: bool,
}

impl FileRegistrar {
    /// Registrar writing below `target_dir`, flattened or nested.
    pub fn new(target_dir: impl Into<PathBuf>, flatten: bool) -> Self {
        Self {
            target_dir: target_dir.into(),
            flatten,
        }
    }

    /// Registrar for the target directory and layout of `job`.
    pub fn for_job(job: &Job) -> Self {
        Self::new(&job.target_dir, job.flatten)
    }

    /// Root directory all files are written below.
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// See [`paths_for`].
    pub fn paths_for(&self, entry: &ConfigEntry) -> BTreeSet<PathBuf> {
        paths_for(entry, &self.target_dir, self.flatten)
    }

    /// True if at least one of the entry's files exists.
    ///
    /// Always false for entries with unsafe keys, which are never written.
    pub fn is_registered(&self, entry: &ConfigEntry) -> bool {
        if check_keys(entry).is_err() {
            return false;
        }
        self.paths_for(entry).iter().any(|path| path.exists())
    }

    /// Write every key of `entry`, replacing existing files.
    ///
    /// Returns the written paths. On failure during the final rename phase,
    /// [`PartialFailure::completed`] lists the files already replaced.
    /// An entry without data keys touches nothing.
    pub fn register(&self, entry: &ConfigEntry) -> Result<Vec<PathBuf>, PartialFailure> {
        check_keys(entry)?;
        if entry.data.is_empty() {
            return Ok(Vec::new());
        }

        let dir = entry_dir(entry, &self.target_dir, self.flatten);
        fs::create_dir_all(&dir).map_err(|source| RegistrarError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;

        let mut staged = Vec::with_capacity(entry.data.len());
        for (key, content) in &entry.data {
            let path = dir.join(key);
            let file = stage(&dir, &path, content)?;
            staged.push((file, path));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (file, path) in staged {
            if let Err(err) = file.persist(&path) {
                return Err(PartialFailure {
                    completed: written,
                    source: RegistrarError::ReplaceFile {
                        path,
                        source: err.error,
                    },
                });
            }
            written.push(path);
        }

        Ok(written)
    }

    /// Delete every file of `entry`. Missing files are skipped.
    ///
    /// Returns the paths that were actually removed. In nested mode the
    /// emptied `<namespace>/<name>` and `<namespace>` directories are removed
    /// as well.
    pub fn remove(&self, entry: &ConfigEntry) -> Result<Vec<PathBuf>, PartialFailure> {
        check_keys(entry)?;

        let mut removed = Vec::new();
        for path in self.paths_for(entry) {
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(PartialFailure {
                        completed: removed,
                        source: RegistrarError::RemoveFile { path, source },
                    });
                }
            }
        }

        if !self.flatten {
            self.prune_empty_dirs(entry);
        }

        Ok(removed)
    }

    fn prune_empty_dirs(&self, entry: &ConfigEntry) {
        let name_dir = entry_dir(entry, &self.target_dir, false);
        let namespace_dir = self.target_dir.join(&entry.namespace);

        for dir in [name_dir, namespace_dir] {
            if dir == self.target_dir {
                break;
            }
            // Fails on non-empty directories, which is what we want.
            if fs::remove_dir(&dir).is_err() {
                break;
            }
            tracing::debug!(dir = %dir.display(), "Removed empty directory");
        }
    }
}

fn check_keys(entry: &ConfigEntry) -> Result<(), RegistrarError> {
    match entry.data.keys().find(|key| !is_safe_file_name(key)) {
        Some(key) => Err(RegistrarError::UnsafeKey {
            entry: entry.to_string(),
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

fn stage(dir: &Path, path: &Path, content: &str) -> Result<NamedTempFile, RegistrarError> {
    let write_err = |source| RegistrarError::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tempfile::Builder::new()
        .prefix(".trovilo-")
        .tempfile_in(dir)
        .map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(FILE_MODE))
            .map_err(write_err)?;
    }

    Ok(file)
}
