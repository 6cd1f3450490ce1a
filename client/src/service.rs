//! Sync service - hosts one engine on its own task.
//!
//! The task is the engine's single owner. It serializes every input:
//! connectivity changes, subscription deliveries, commands from handles and
//! finished remote writes. Remote creates run on separate tasks, so a
//! connectivity change is applied right away even while a write is in flight.

use std::sync::Arc;

use listsync_engine::{
    CacheStore, ConnectivityState, Deliveries, ListId, Mode, RemoteListSource, ShoppingList,
    SyncEngine, SyncEvent,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::error::{ClientError, Result};

/// Buffer size of the command channel.
const COMMAND_CAPACITY: usize = 32;

type Reply<T> = oneshot::Sender<T>;

/// Requests sent from handles to the service task.
#[derive(Debug)]
enum Command {
    Submit {
        candidate: ShoppingList,
        reply: Reply<listsync_engine::error::Result<ListId>>,
    },
    Lists {
        reply: Reply<Vec<ShoppingList>>,
    },
    Mode {
        reply: Reply<Mode>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// A remote create that has finished.
struct WriteOutcome {
    candidate: ShoppingList,
    result: listsync_engine::error::Result<ListId>,
    reply: Reply<listsync_engine::error::Result<ListId>>,
}

/// Starts sync services.
pub struct SyncService;

impl SyncService {
    /// Move `engine` onto a new task driven by `connectivity`.
    ///
    /// The state the monitor currently reports is applied immediately. The
    /// returned receiver was subscribed before the task started, so it sees
    /// every event the service publishes, including the first transition.
    pub fn spawn<C, S>(
        engine: SyncEngine<C, Arc<S>>,
        deliveries: Deliveries,
        connectivity: watch::Receiver<ConnectivityState>,
    ) -> (SyncHandle, broadcast::Receiver<SyncEvent>)
    where
        C: CacheStore + Send + 'static,
        S: RemoteListSource + Send + Sync + 'static,
    {
        let (commands, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let events = engine.subscribe_events();
        let handle = SyncHandle {
            commands,
            events: events.resubscribe(),
        };

        tokio::spawn(run(engine, deliveries, connectivity, commands_rx));

        (handle, events)
    }
}

async fn run<C, S>(
    mut engine: SyncEngine<C, Arc<S>>,
    mut deliveries: Deliveries,
    mut connectivity: watch::Receiver<ConnectivityState>,
    mut commands: mpsc::Receiver<Command>,
) where
    C: CacheStore + Send + 'static,
    S: RemoteListSource + Send + Sync + 'static,
{
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<WriteOutcome>();

    let initial = *connectivity.borrow_and_update();
    engine.on_connectivity_changed(initial);

    let mut monitor_open = true;

    loop {
        tokio::select! {
            changed = connectivity.changed(), if monitor_open => match changed {
                Ok(()) => {
                    let state = *connectivity.borrow_and_update();
                    tracing::debug!(%state, "Connectivity transition");
                    engine.on_connectivity_changed(state);
                }
                Err(_) => {
                    tracing::debug!("Connectivity monitor closed");
                    monitor_open = false;
                }
            },

            Some(delivery) = deliveries.recv() => {
                engine.on_remote_snapshot(delivery);
            }

            Some(outcome) = done_rx.recv() => {
                let result = engine.complete_submit(outcome.candidate, outcome.result);
                let _ = outcome.reply.send(result);
            }

            command = commands.recv() => match command {
                Some(Command::Submit { candidate, reply }) => {
                    if let Err(e) = engine.prepare_submit(&candidate) {
                        let _ = reply.send(Err(e));
                        continue;
                    }

                    let source = Arc::clone(engine.source());
                    let done_tx = done_tx.clone();
                    tokio::spawn(async move {
                        let result = source.create(&candidate).await;
                        if done_tx
                            .send(WriteOutcome { candidate, result, reply })
                            .is_err()
                        {
                            tracing::debug!("Write finished after service stopped");
                        }
                    });
                }
                Some(Command::Lists { reply }) => {
                    let _ = reply.send(engine.current_lists().to_vec());
                }
                Some(Command::Mode { reply }) => {
                    let _ = reply.send(engine.mode());
                }
                Some(Command::Shutdown { reply }) => {
                    engine.shutdown();
                    let _ = reply.send(());
                    break;
                }
                None => {
                    tracing::debug!("All handles dropped");
                    engine.shutdown();
                    break;
                }
            },
        }
    }

    tracing::info!(owner_id = %engine.owner_id(), "Sync service stopped");
}

/// Handle to a running sync service.
///
/// Cloning is cheap; the service stops when `shutdown` is called or every
/// handle has been dropped.
#[derive(Debug)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Receiver<SyncEvent>,
}

impl Clone for SyncHandle {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            events: self.events.resubscribe(),
        }
    }
}

impl SyncHandle {
    /// Receive every event published from now on.
    ///
    /// Events published before this call are not replayed; use the receiver
    /// returned by [`SyncService::spawn`] to observe the service from the start.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.resubscribe()
    }

    /// Submit a new list and wait for the remote outcome.
    pub async fn submit(&self, candidate: ShoppingList) -> Result<ListId> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Submit { candidate, reply }).await?;
        let result = rx.await.map_err(|_| ClientError::ServiceStopped)?;
        Ok(result?)
    }

    /// The current list view.
    pub async fn lists(&self) -> Result<Vec<ShoppingList>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Lists { reply }).await?;
        rx.await.map_err(|_| ClientError::ServiceStopped)
    }

    /// The engine's current mode.
    pub async fn mode(&self) -> Result<Mode> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Mode { reply }).await?;
        rx.await.map_err(|_| ClientError::ServiceStopped)
    }

    /// Shut the engine down and stop the service. Safe to call more than once.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::ServiceStopped)
    }
}
