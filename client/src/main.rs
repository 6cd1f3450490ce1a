//! listsync - shopping lists that keep working offline.
//!
//! Reads commands from stdin. Lists are kept by an in-process remote source
//! for the lifetime of the process, while the local cache survives restarts:
//! start offline and the last lists you saw are still there.

use listsync_client::cli::{Input, HELP};
use listsync_client::{
    ClientError, Config, FileCacheStore, Identity, ManualConnectivity, ProbeMonitor, SyncService,
};
use listsync_engine::{
    ConnectivityState, EngineConfig, Error, MemoryRemoteSource, ShoppingList, SyncEngine,
    SyncEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (stdout is for the lists themselves)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listsync_client=info,listsync_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let identity = Identity::resolve(&config)?;
    tracing::info!(
        owner_id = %identity.owner_id(),
        data_dir = %config.data_dir.display(),
        "Starting listsync"
    );

    let cache = FileCacheStore::open(&config.data_dir)?;
    let source = MemoryRemoteSource::new_shared();
    let (engine, deliveries) = SyncEngine::new(
        EngineConfig::new(identity.owner_id()).with_cache_key(config.cache_key.clone()),
        cache,
        source,
    )?;

    // A probe drives connectivity when configured, otherwise the user does
    let (manual, connectivity) = match &config.probe {
        Some(probe) => {
            tracing::info!(url = %probe.url, "Probing connectivity");
            let (rx, _task) = ProbeMonitor::new(probe.clone())?.spawn();
            (None, rx)
        }
        None => {
            let manual = ManualConnectivity::new(ConnectivityState::Connected);
            let rx = manual.subscribe();
            (Some(manual), rx)
        }
    };

    let (handle, events) = SyncService::spawn(engine, deliveries, connectivity.clone());
    let printer = tokio::spawn(print_events(events));

    println!("Shopping Lists - type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Input::parse(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => println!("{}", HELP),
            Input::Show => print_lists(&handle.lists().await?),
            Input::Json => println!("{}", serde_json::to_string_pretty(&handle.lists().await?)?),
            Input::Status => println!(
                "mode: {:?}, connectivity: {}",
                handle.mode().await?,
                *connectivity.borrow()
            ),
            Input::Online | Input::Offline if manual.is_none() => {
                println!("Connectivity is probed automatically.");
            }
            Input::Online => set_manual(&manual, ConnectivityState::Connected),
            Input::Offline => set_manual(&manual, ConnectivityState::Disconnected),
            input @ Input::Add { .. } => {
                // Adding needs the remote source; the form is hidden while offline
                if *connectivity.borrow() != ConnectivityState::Connected {
                    println!("Adding lists is unavailable while offline.");
                    continue;
                }
                let Some(list) = input.into_list(identity.owner_id()) else {
                    continue;
                };
                let name = list.name.clone();
                match handle.submit(list).await {
                    Ok(_) => println!("The list '{}' has been added.", name),
                    Err(ClientError::Engine(Error::RemoteWrite(_))) => {
                        println!("Unable to add. Please try later.")
                    }
                    Err(e) => println!("Unable to add: {}", e),
                }
            }
            Input::Unknown(line) => println!("Unknown command: {} (try 'help')", line),
        }
    }

    handle.shutdown().await;
    printer.abort();

    Ok(())
}

fn set_manual(manual: &Option<ManualConnectivity>, state: ConnectivityState) {
    if let Some(manual) = manual {
        manual.set(state);
    }
}

async fn print_events(mut events: broadcast::Receiver<SyncEvent>) {
    loop {
        match events.recv().await {
            Ok(SyncEvent::ListsUpdated { lists }) => print_lists(&lists),
            Ok(SyncEvent::WriteFailed { reason }) => {
                tracing::warn!(%reason, "List was not saved");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Missed list updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_lists(lists: &[ShoppingList]) {
    if lists.is_empty() {
        println!("  (no lists)");
        return;
    }
    for list in lists {
        if list.is_pending() {
            println!("  {} (saving)", list);
        } else {
            println!("  {}", list);
        }
    }
}
