//! Network reachability as seen by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connectivity reported by a monitor.
///
/// `Unknown` is an ambiguous signal (e.g. the platform has not finished
/// probing yet) and never changes the engine's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    Connected,
    Disconnected,
    #[default]
    Unknown,
}

impl From<Option<bool>> for ConnectivityState {
    fn from(reachable: Option<bool>) -> Self {
        match reachable {
            Some(true) => ConnectivityState::Connected,
            Some(false) => ConnectivityState::Disconnected,
            None => ConnectivityState::Unknown,
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectivityState::Connected => "connected",
            ConnectivityState::Disconnected => "disconnected",
            ConnectivityState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}
