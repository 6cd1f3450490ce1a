//! Local cache store contract.
//!
//! The engine keeps the last known list view in a key-value store that
//! survives restarts. Reads never fail from the engine's point of view: a
//! missing or malformed value is reported as `None`.

use crate::{error::Result, CacheSnapshot, Error};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Default key under which the list view is stored.
pub const DEFAULT_CACHE_KEY: &str = "shopping_lists";

/// Key-value persistence for cache snapshots.
pub trait CacheStore {
    /// Read the snapshot stored under `key`.
    ///
    /// Returns `None` when the key is missing or its contents do not parse.
    fn read(&self, key: &str) -> Option<CacheSnapshot>;

    /// Replace the snapshot stored under `key`.
    fn write(&self, key: &str, snapshot: &CacheSnapshot) -> Result<()>;
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn read(&self, key: &str) -> Option<CacheSnapshot> {
        (**self).read(key)
    }

    fn write(&self, key: &str, snapshot: &CacheSnapshot) -> Result<()> {
        (**self).write(key, snapshot)
    }
}

/// In-memory cache store holding serialized snapshots.
///
/// Values are kept as JSON blobs so reads exercise the same decoding path as
/// a persistent store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    blobs: DashMap<String, String>,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryCacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Store a raw value under `key`, bypassing serialization.
    pub fn put_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.blobs.insert(key.into(), value.into());
    }

    /// The raw value stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.blobs.get(key).map(|v| v.value().clone())
    }

    /// Number of `read` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl CacheStore for MemoryCacheStore {
    fn read(&self, key: &str) -> Option<CacheSnapshot> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let blob = self.blobs.get(key)?;
        match CacheSnapshot::from_json(blob.value()) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding malformed cache entry");
                None
            }
        }
    }

    fn write(&self, key: &str, snapshot: &CacheSnapshot) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Cache(format!("write to '{}' rejected", key)));
        }
        let json = snapshot.to_json()?;
        self.blobs.insert(key.to_string(), json);
        Ok(())
    }
}
