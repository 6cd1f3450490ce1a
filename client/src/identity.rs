//! Device-local identity.
//!
//! Anonymous sign-in mints a random owner id once and keeps it in the data
//! directory, so the same device keeps seeing the same lists across restarts.

use crate::config::Config;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// File name of the persisted identity inside the data directory.
pub const IDENTITY_FILE: &str = "identity.json";

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    owner_id: String,
    anonymous: bool,
}

impl Identity {
    /// Use a known owner id.
    pub fn explicit(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            anonymous: false,
        }
    }

    /// Load the anonymous identity stored in `dir`, creating one if needed.
    pub fn load_or_create(dir: &Path) -> Result<Self> {
        let path = dir.join(IDENTITY_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let identity: Identity = serde_json::from_str(&contents)?;
                tracing::debug!(owner_id = %identity.owner_id, "Loaded identity");
                Ok(identity)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let identity = Self {
                    owner_id: uuid::Uuid::new_v4().to_string(),
                    anonymous: true,
                };
                fs::create_dir_all(dir)?;
                fs::write(&path, serde_json::to_string(&identity)?)?;
                tracing::info!(owner_id = %identity.owner_id, "Signed in anonymously");
                Ok(identity)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pick the identity for a configuration: the explicit owner id if one is
    /// set, the stored anonymous identity otherwise.
    pub fn resolve(config: &Config) -> Result<Self> {
        match &config.owner_id {
            Some(owner_id) => Ok(Self::explicit(owner_id.clone())),
            None => Self::load_or_create(&config.data_dir),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}
