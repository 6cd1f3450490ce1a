//! Error types for the listsync engine.

use crate::{ListId, OwnerId};
use thiserror::Error;

/// All possible errors from the listsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Submission errors
    #[error("list name must not be empty")]
    EmptyName,

    #[error("owner mismatch: expected {expected}, got {actual}")]
    OwnerMismatch { expected: OwnerId, actual: OwnerId },

    #[error("list already persisted remotely: {0}")]
    AlreadyPersisted(ListId),

    // Collaborator errors
    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    #[error("subscription failed: {0}")]
    Subscribe(String),

    #[error("cache error: {0}")]
    Cache(String),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("owner id must not be empty")]
    EmptyOwner,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::EmptyName;
        assert_eq!(err.to_string(), "list name must not be empty");

        let err = Error::OwnerMismatch {
            expected: "u1".into(),
            actual: "u2".into(),
        };
        assert_eq!(err.to_string(), "owner mismatch: expected u1, got u2");

        let err = Error::RemoteWrite("quota exceeded".into());
        assert_eq!(err.to_string(), "remote write failed: quota exceeded");
    }
}
