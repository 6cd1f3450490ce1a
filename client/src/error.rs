//! Unified error handling for the client.

use crate::config::ConfigError;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Engine error: {0}")]
    Engine(#[from] listsync_engine::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid identity file: {0}")]
    Identity(#[from] serde_json::Error),

    #[error("Sync service has stopped")]
    ServiceStopped,
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
