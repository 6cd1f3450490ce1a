//! # listsync engine
//!
//! Online/offline synchronization of a user's shopping lists.
//!
//! The engine reconciles a remote, continuously updated collection of lists
//! with a locally persisted cache. Connectivity transitions decide where the
//! list view comes from; every remote update is written through to the cache
//! so the last known state is available offline.
//!
//! ## Design Principles
//!
//! - **No IO**: collaborators (cache, remote source) sit behind traits
//! - **Single owner**: one task mutates an engine; inputs are serialized
//! - **Generations**: each subscription is tagged, stale deliveries are dropped
//! - **Degrade, never crash**: cache problems fall back to an empty or stale view
//!
//! ## Core Concepts
//!
//! ### Modes
//!
//! - [`Mode::Idle`] - nothing handled yet (or shut down)
//! - [`Mode::Live`] - subscribed to the [`RemoteListSource`]
//! - [`Mode::Cached`] - serving the last [`CacheSnapshot`]
//!
//! ### Events
//!
//! Consumers observe the engine through [`SyncEvent`]s:
//! - [`SyncEvent::ListsUpdated`] after transitions, snapshots and optimistic writes
//! - [`SyncEvent::WriteFailed`] when creating a list fails remotely
//!
//! ## Quick Start
//!
//! ```rust
//! use listsync_engine::{
//!     ConnectivityState, EngineConfig, MemoryCacheStore, MemoryRemoteSource, Mode,
//!     ShoppingList, SyncEngine,
//! };
//!
//! let source = MemoryRemoteSource::new_shared();
//! source.insert(ShoppingList::new("user_1", "Groceries", ["Milk", "Eggs"]));
//!
//! let (mut engine, mut deliveries) = SyncEngine::new(
//!     EngineConfig::new("user_1"),
//!     MemoryCacheStore::new(),
//!     source.clone(),
//! )
//! .unwrap();
//!
//! assert_eq!(engine.on_connectivity_changed(ConnectivityState::Connected), Mode::Live);
//! engine.process_pending(&mut deliveries);
//! assert_eq!(engine.current_lists().len(), 1);
//!
//! // Going offline serves the snapshot that was written through to the cache
//! engine.on_connectivity_changed(ConnectivityState::Disconnected);
//! assert_eq!(engine.current_lists()[0].name, "Groceries");
//!
//! engine.shutdown();
//! ```

pub mod cache;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod event;
pub mod list;
pub mod remote;
pub mod snapshot;

// Re-export main types at crate root
pub use cache::{CacheStore, MemoryCacheStore, DEFAULT_CACHE_KEY};
pub use connectivity::ConnectivityState;
pub use engine::{EngineConfig, Mode, SyncEngine, DEFAULT_EVENT_CAPACITY};
pub use error::Error;
pub use event::SyncEvent;
pub use list::ShoppingList;
pub use remote::{
    Deliveries, Delivery, MemoryRemoteSource, RemoteListSource, SnapshotSink, SubscriptionHandle,
};
pub use snapshot::{CacheSnapshot, SNAPSHOT_FORMAT_VERSION};

/// Type aliases for clarity
pub type ListId = String;
pub type OwnerId = String;
pub type Generation = u64;
