//! Local-filesystem object store: a directory tree addressed by
//! slash-separated keys. The production backend for single-machine runs and
//! the workhorse of the integration tests.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::contract::{GetResult, ListedObject, ObjectStore, StoreError};

/// Object store over a local directory. Keys map to relative paths under the
/// root; `put` is atomic via a same-directory temp file and rename.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

fn visit_dir(
    dir: &Path,
    store: &FsStore,
    prefix: &str,
    results: &mut Vec<ListedObject>,
) -> Result<(), StoreError> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::Io {
        key: dir.to_string_lossy().into_owned(),
        source: e,
    })?;
    for entry_res in entries {
        let entry = entry_res.map_err(|e| StoreError::Io {
            key: dir.to_string_lossy().into_owned(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            visit_dir(&path, store, prefix, results)?;
        } else if path.is_file() {
            let Some(key) = store.key_for(&path) else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            let last_modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| StoreError::Io {
                    key: key.clone(),
                    source: e,
                })?;
            results.push(ListedObject { key, last_modified });
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ListedObject>, StoreError> {
        if !self.root.exists() {
            debug!(root = %self.root.display(), "Bucket root does not exist; empty listing");
            return Ok(Vec::new());
        }
        let mut results = Vec::new();
        visit_dir(&self.root, self, prefix, &mut results)?;
        results.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(prefix, count = results.len(), "Listed bucket objects");
        Ok(results)
    }

    async fn get(&self, key: &str) -> Result<GetResult, StoreError> {
        match fs::read(self.object_path(key)) {
            Ok(bytes) => Ok(GetResult::Found(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GetResult::Missing),
            Err(e) => Err(StoreError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.object_path(key);
        let parent = path.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&parent).map_err(|e| StoreError::Io {
            key: key.to_string(),
            source: e,
        })?;

        // Write to a temp file in the destination directory, then rename, so
        // readers only ever observe complete objects.
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| StoreError::Io {
            key: key.to_string(),
            source: e,
        })?;
        tmp.write_all(bytes).map_err(|e| StoreError::Io {
            key: key.to_string(),
            source: e,
        })?;
        tmp.persist(&path).map_err(|e| StoreError::Io {
            key: key.to_string(),
            source: e.error,
        })?;
        debug!(key, size = bytes.len(), "Wrote bucket object");
        Ok(())
    }
}
