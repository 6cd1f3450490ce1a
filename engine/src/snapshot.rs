//! Cache snapshots of the list view.
//!
//! A snapshot is the whole list view at one point in time. There is no
//! incremental format: every write replaces the previous snapshot.

use crate::{error::Result, Error, ShoppingList};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// The persisted list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Lists in the order they were published
    pub lists: Vec<ShoppingList>,
}

/// Accepted encodings. Caches written by the mobile app hold a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum Encoded {
    Envelope(CacheSnapshot),
    Bare(Vec<ShoppingList>),
}

impl CacheSnapshot {
    /// Create a snapshot of the given lists.
    pub fn new(lists: Vec<ShoppingList>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            lists,
        }
    }

    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn into_lists(self) -> Vec<ShoppingList> {
        self.lists
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON, accepting both the envelope and a bare array.
    pub fn from_json(json: &str) -> Result<Self> {
        let encoded: Encoded =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        let snapshot = match encoded {
            Encoded::Envelope(snapshot) => snapshot,
            Encoded::Bare(lists) => Self::new(lists),
        };

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<ShoppingList>> for CacheSnapshot {
    fn from(lists: Vec<ShoppingList>) -> Self {
        Self::new(lists)
    }
}
