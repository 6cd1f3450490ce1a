//! Connectivity monitors.
//!
//! Monitors publish [`ConnectivityState`] through a `watch` channel. The
//! sync service reacts to every value sent, so a monitor decides for itself
//! whether to resend an unchanged state.

use crate::config::ProbeConfig;
use crate::error::Result;
use listsync_engine::ConnectivityState;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Connectivity switched explicitly by the application.
#[derive(Debug)]
pub struct ManualConnectivity {
    tx: watch::Sender<ConnectivityState>,
}

impl ManualConnectivity {
    pub fn new(initial: ConnectivityState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Report a new state. Always notifies, even if the state is unchanged.
    pub fn set(&self, state: ConnectivityState) {
        self.tx.send_replace(state);
    }

    pub fn state(&self) -> ConnectivityState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.tx.subscribe()
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(ConnectivityState::Unknown)
    }
}

/// Polls a URL and reports whether it answers.
///
/// Any HTTP response counts as reachable; only transport errors and timeouts
/// count as disconnected. Starts out `Unknown` and only emits on change.
#[derive(Debug, Clone)]
pub struct ProbeMonitor {
    client: reqwest::Client,
    config: ProbeConfig,
}

impl ProbeMonitor {
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Probe once.
    pub async fn check(&self) -> ConnectivityState {
        match self.client.head(&self.config.url).send().await {
            Ok(response) => {
                tracing::trace!(status = %response.status(), "Probe answered");
                ConnectivityState::Connected
            }
            Err(e) => {
                tracing::debug!(url = %self.config.url, error = %e, "Probe failed");
                ConnectivityState::Disconnected
            }
        }
    }

    /// Start polling in the background.
    ///
    /// The task stops once every receiver has been dropped.
    pub fn spawn(self) -> (watch::Receiver<ConnectivityState>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(ConnectivityState::Unknown);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tx.closed() => break,
                }

                let state = self.check().await;
                let changed = tx.send_if_modified(|current| {
                    if *current == state {
                        false
                    } else {
                        *current = state;
                        true
                    }
                });
                if changed {
                    tracing::info!(url = %self.config.url, %state, "Connectivity changed");
                }
            }
            tracing::debug!("Connectivity probe stopped");
        });

        (rx, handle)
    }
}
