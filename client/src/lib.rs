//! listsync client - hosts the sync engine for an application.
//!
//! This crate provides the pieces an app wires around the engine: a
//! file-backed cache, connectivity monitors, a device-local identity and a
//! service task that owns the engine and serializes its inputs.

pub mod cli;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod file_cache;
pub mod identity;
pub mod service;

pub use config::{Config, ConfigError, ProbeConfig};
pub use connectivity::{ManualConnectivity, ProbeMonitor};
pub use error::{ClientError, Result};
pub use file_cache::FileCacheStore;
pub use identity::Identity;
pub use service::{SyncHandle, SyncService};
