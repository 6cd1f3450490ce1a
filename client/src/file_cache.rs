//! File-backed cache store.
//!
//! Each key is stored as `<key>.json` in a data directory. Writes go to a
//! uniquely named temporary file in the same directory and are persisted
//! over the target, so a crash mid-write leaves the previous snapshot intact
//! and concurrent writers never share a temporary file.

use listsync_engine::{CacheSnapshot, CacheStore, Error};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Cache store persisting snapshots as JSON files.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl CacheStore for FileCacheStore {
    fn read(&self, key: &str) -> Option<CacheSnapshot> {
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cache file");
                return None;
            }
        };

        match CacheSnapshot::from_json(&contents) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding malformed cache file");
                None
            }
        }
    }

    fn write(&self, key: &str, snapshot: &CacheSnapshot) -> listsync_engine::error::Result<()> {
        let path = self.path_for(key);
        let json = snapshot.to_json()?;

        let mut temp_file =
            NamedTempFile::new_in(&self.dir).map_err(|e| Error::Cache(e.to_string()))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| Error::Cache(e.to_string()))?;
        temp_file.flush().map_err(|e| Error::Cache(e.to_string()))?;
        temp_file
            .persist(&path)
            .map_err(|e| Error::Cache(e.error.to_string()))?;

        tracing::trace!(path = %path.display(), lists = snapshot.len(), "Wrote cache file");
        Ok(())
    }
}
