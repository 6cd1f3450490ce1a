//! Configuration management for the client.

use listsync_engine::DEFAULT_CACHE_KEY;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the cache and identity files
    pub data_dir: PathBuf,
    /// Explicit owner id; anonymous sign-in is used when absent
    pub owner_id: Option<String>,
    /// Cache key for the list snapshot
    pub cache_key: String,
    /// Reachability probe; connectivity is switched by hand when absent
    pub probe: Option<ProbeConfig>,
}

/// Settings for the HTTP reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub url: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup("LISTSYNC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".listsync"));

        let owner_id = lookup("LISTSYNC_OWNER_ID").filter(|id| !id.trim().is_empty());

        let cache_key =
            lookup("LISTSYNC_CACHE_KEY").unwrap_or_else(|| DEFAULT_CACHE_KEY.to_string());

        let probe = match lookup("LISTSYNC_PROBE_URL") {
            Some(url) if !url.trim().is_empty() => {
                let interval = parse_positive(&lookup, "LISTSYNC_PROBE_INTERVAL_SECS", 5)?;
                let timeout = parse_positive(&lookup, "LISTSYNC_PROBE_TIMEOUT_MS", 2000)?;
                Some(ProbeConfig {
                    url,
                    interval: Duration::from_secs(interval),
                    timeout: Duration::from_millis(timeout),
                })
            }
            _ => None,
        };

        Ok(Self {
            data_dir,
            owner_id,
            cache_key,
            probe,
        })
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".listsync"));
        assert_eq!(config.owner_id, None);
        assert_eq!(config.cache_key, "shopping_lists");
        assert_eq!(config.probe, None);
    }

    #[test]
    fn probe_settings() {
        let config = Config::from_lookup(lookup(&[
            ("LISTSYNC_PROBE_URL", "https://example.com/health"),
            ("LISTSYNC_PROBE_INTERVAL_SECS", "10"),
        ]))
        .unwrap();

        let probe = config.probe.unwrap();
        assert_eq!(probe.url, "https://example.com/health");
        assert_eq!(probe.interval, Duration::from_secs(10));
        assert_eq!(probe.timeout, Duration::from_millis(2000));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("LISTSYNC_PROBE_URL", "https://example.com"),
            ("LISTSYNC_PROBE_TIMEOUT_MS", "soon"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber {
                name: "LISTSYNC_PROBE_TIMEOUT_MS",
                ..
            })
        ));

        let result = Config::from_lookup(lookup(&[
            ("LISTSYNC_PROBE_URL", "https://example.com"),
            ("LISTSYNC_PROBE_INTERVAL_SECS", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn blank_owner_means_anonymous() {
        let config = Config::from_lookup(lookup(&[("LISTSYNC_OWNER_ID", "  ")])).unwrap();
        assert_eq!(config.owner_id, None);
    }
}
