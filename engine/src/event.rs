//! Events published by the engine to its consumers.

use crate::ShoppingList;
use serde::{Deserialize, Serialize};

/// Outward notifications from a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// The list view changed (mode transition, remote snapshot or optimistic write).
    ListsUpdated { lists: Vec<ShoppingList> },
    /// Submitting a new list to the remote source failed.
    WriteFailed { reason: String },
}

impl SyncEvent {
    /// The published lists, if this is a `ListsUpdated` event.
    pub fn lists(&self) -> Option<&[ShoppingList]> {
        match self {
            SyncEvent::ListsUpdated { lists } => Some(lists),
            SyncEvent::WriteFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_format() {
        let event = SyncEvent::WriteFailed {
            reason: "offline".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"write_failed","reason":"offline"}"#);

        let event = SyncEvent::ListsUpdated { lists: Vec::new() };
        assert_eq!(event.lists(), Some(&[][..]));
    }
}
