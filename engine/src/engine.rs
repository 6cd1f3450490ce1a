//! SyncEngine - the online/offline state machine.
//!
//! The engine owns the canonical list view for one signed-in owner. While
//! connected it holds exactly one subscription to the remote source and
//! writes every snapshot through to the cache. While disconnected it serves
//! whatever the cache last held.
//!
//! Every subscription is tagged with a generation number. Deliveries carry
//! that number back, and anything not from the current generation is dropped,
//! which covers snapshots that were already in flight when a subscription was
//! canceled or replaced.

use crate::{
    cache::DEFAULT_CACHE_KEY,
    error::Result,
    remote::{Deliveries, Delivery, SnapshotSink, SubscriptionHandle},
    CacheSnapshot, CacheStore, ConnectivityState, Error, Generation, ListId, OwnerId,
    RemoteListSource, ShoppingList, SyncEvent,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

/// Default buffer size of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Where the current list view comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// No connectivity signal handled yet, or shut down
    Idle,
    /// Subscribed to the remote source
    Live,
    /// Serving the cached snapshot
    Cached,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Identity of the signed-in user
    pub owner_id: OwnerId,
    /// Cache key holding the list snapshot
    pub cache_key: String,
    /// Buffer size of the event channel
    pub event_capacity: usize,
}

impl EngineConfig {
    pub fn new(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = cache_key.into();
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

#[derive(Debug)]
struct ActiveSubscription {
    generation: Generation,
    handle: SubscriptionHandle,
}

/// The list synchronization engine.
pub struct SyncEngine<C: CacheStore, R: RemoteListSource> {
    config: EngineConfig,
    cache: C,
    source: R,
    mode: Mode,
    current_lists: Vec<ShoppingList>,
    active: Option<ActiveSubscription>,
    /// Last generation handed out; 0 means none yet
    generation: Generation,
    deliveries_tx: mpsc::UnboundedSender<Delivery>,
    events: broadcast::Sender<SyncEvent>,
}

impl<C: CacheStore, R: RemoteListSource> SyncEngine<C, R> {
    /// Create an idle engine.
    ///
    /// Returns the engine together with the receiving end of its delivery
    /// channel. The owner of the engine feeds received deliveries back through
    /// [`on_remote_snapshot`](Self::on_remote_snapshot) or
    /// [`process_pending`](Self::process_pending).
    pub fn new(config: EngineConfig, cache: C, source: R) -> Result<(Self, Deliveries)> {
        if config.owner_id.trim().is_empty() {
            return Err(Error::EmptyOwner);
        }

        let (deliveries_tx, deliveries_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let engine = Self {
            config,
            cache,
            source,
            mode: Mode::Idle,
            current_lists: Vec::new(),
            active: None,
            generation: 0,
            deliveries_tx,
            events,
        };

        Ok((engine, deliveries_rx))
    }

    pub fn owner_id(&self) -> &str {
        &self.config.owner_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_lists(&self) -> &[ShoppingList] {
        &self.current_lists
    }

    /// Generation of the open subscription, if any.
    pub fn active_generation(&self) -> Option<Generation> {
        self.active.as_ref().map(|a| a.generation)
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// Receive every event published from now on.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// React to a connectivity transition and return the resulting mode.
    pub fn on_connectivity_changed(&mut self, state: ConnectivityState) -> Mode {
        match state {
            ConnectivityState::Connected => self.go_live(),
            ConnectivityState::Disconnected => self.go_cached(),
            ConnectivityState::Unknown => {
                tracing::debug!(mode = ?self.mode, "Ignoring unknown connectivity state");
                self.mode
            }
        }
    }

    fn go_live(&mut self) -> Mode {
        // Cancel before open: two live subscriptions would deliver twice.
        self.cancel_active();

        self.generation += 1;
        let generation = self.generation;
        let sink = SnapshotSink::new(generation, self.deliveries_tx.clone());

        match self.source.subscribe(&self.config.owner_id, sink) {
            Ok(handle) => {
                self.active = Some(ActiveSubscription { generation, handle });
                self.mode = Mode::Live;
                tracing::info!(
                    owner_id = %self.config.owner_id,
                    generation,
                    "Subscribed to remote lists"
                );
                self.publish_lists();
                Mode::Live
            }
            Err(e) => {
                tracing::error!(
                    owner_id = %self.config.owner_id,
                    error = %e,
                    "Remote subscription failed, serving cached lists"
                );
                self.go_cached()
            }
        }
    }

    fn go_cached(&mut self) -> Mode {
        self.cancel_active();

        let snapshot = match self.cache.read(&self.config.cache_key) {
            Some(snapshot) => snapshot,
            None => {
                tracing::debug!(key = %self.config.cache_key, "No cached lists, starting empty");
                CacheSnapshot::empty()
            }
        };
        self.current_lists = self.retain_owned(snapshot.into_lists());
        self.mode = Mode::Cached;

        tracing::info!(lists = self.current_lists.len(), "Serving cached lists");
        self.publish_lists();
        Mode::Cached
    }

    /// Apply a snapshot delivered by a subscription.
    ///
    /// Returns false if the delivery was dropped because its subscription is
    /// no longer the active one.
    pub fn on_remote_snapshot(&mut self, delivery: Delivery) -> bool {
        let active = self.active_generation();
        if self.mode != Mode::Live || active != Some(delivery.generation) {
            tracing::debug!(
                generation = delivery.generation,
                active = ?active,
                "Dropping snapshot from stale subscription"
            );
            return false;
        }

        let snapshot: CacheSnapshot = self.retain_owned(delivery.lists).into();
        if let Err(e) = self.cache.write(&self.config.cache_key, &snapshot) {
            tracing::warn!(
                key = %self.config.cache_key,
                error = %e,
                "Failed to cache remote snapshot"
            );
        }
        self.current_lists = snapshot.into_lists();

        tracing::debug!(
            generation = delivery.generation,
            lists = self.current_lists.len(),
            "Applied remote snapshot"
        );
        self.publish_lists();
        true
    }

    /// Apply every delivery already queued, without waiting.
    ///
    /// Returns how many were applied (stale ones are drained but not counted).
    pub fn process_pending(&mut self, deliveries: &mut Deliveries) -> usize {
        let mut applied = 0;
        while let Ok(delivery) = deliveries.try_recv() {
            if self.on_remote_snapshot(delivery) {
                applied += 1;
            }
        }
        applied
    }

    /// Check that `candidate` may be submitted as a new list.
    pub fn prepare_submit(&self, candidate: &ShoppingList) -> Result<()> {
        candidate.validate_new(&self.config.owner_id)
    }

    /// Fold the outcome of a remote create into the list view.
    ///
    /// On success the candidate is shown first right away, without its new id,
    /// until the next remote snapshot replaces it. On failure `WriteFailed` is
    /// published and the view is left alone.
    pub fn complete_submit(
        &mut self,
        candidate: ShoppingList,
        result: Result<ListId>,
    ) -> Result<ListId> {
        match result {
            Ok(id) => {
                tracing::info!(id = %id, name = %candidate.name, "List created");
                self.current_lists.insert(0, candidate);
                self.publish_lists();
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(name = %candidate.name, error = %e, "Failed to create list");
                self.publish(SyncEvent::WriteFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Submit a new list to the remote source.
    ///
    /// The write is attempted regardless of mode; hiding the affordance while
    /// offline is up to the caller.
    pub async fn submit_new_list(&mut self, candidate: ShoppingList) -> Result<ListId> {
        self.prepare_submit(&candidate)?;
        let result = self.source.create(&candidate).await;
        self.complete_submit(candidate, result)
    }

    /// Release the remote subscription. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.active.is_some() || self.mode != Mode::Idle {
            tracing::info!(owner_id = %self.config.owner_id, "Shutting down sync engine");
        }
        self.cancel_active();
        self.mode = Mode::Idle;
    }

    fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            self.source.cancel(&active.handle);
            tracing::debug!(generation = active.generation, "Canceled remote subscription");
        }
    }

    /// Drop lists that belong to anyone but the signed-in owner.
    fn retain_owned(&self, mut lists: Vec<ShoppingList>) -> Vec<ShoppingList> {
        let before = lists.len();
        lists.retain(|l| l.owner_id == self.config.owner_id);
        let dropped = before - lists.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped lists belonging to another owner");
        }
        lists
    }

    fn publish_lists(&self) {
        self.publish(SyncEvent::ListsUpdated {
            lists: self.current_lists.clone(),
        });
    }

    fn publish(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }
}

impl<C: CacheStore, R: RemoteListSource> Drop for SyncEngine<C, R> {
    fn drop(&mut self) {
        if self.active.is_some() {
            tracing::debug!("Releasing remote subscription on drop");
            self.cancel_active();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryCacheStore, MemoryRemoteSource};
    use std::sync::Arc;

    type TestEngine = SyncEngine<Arc<MemoryCacheStore>, Arc<MemoryRemoteSource>>;

    fn test_engine() -> (
        TestEngine,
        Deliveries,
        Arc<MemoryCacheStore>,
        Arc<MemoryRemoteSource>,
    ) {
        let cache = MemoryCacheStore::new_shared();
        let source = MemoryRemoteSource::new_shared();
        let (engine, deliveries) =
            SyncEngine::new(EngineConfig::new("u1"), cache.clone(), source.clone()).unwrap();
        (engine, deliveries, cache, source)
    }

    #[test]
    fn starts_idle() {
        let (engine, _deliveries, _, _) = test_engine();
        assert_eq!(engine.mode(), Mode::Idle);
        assert!(engine.current_lists().is_empty());
        assert_eq!(engine.active_generation(), None);
        assert_eq!(engine.owner_id(), "u1");
    }

    #[test]
    fn rejects_empty_owner() {
        let result = SyncEngine::new(
            EngineConfig::new("  "),
            MemoryCacheStore::new(),
            MemoryRemoteSource::new(),
        );
        assert!(matches!(result, Err(Error::EmptyOwner)));
    }

    #[test]
    fn connected_goes_live_and_applies_snapshot() {
        let (mut engine, mut deliveries, cache, source) = test_engine();
        source.insert(ShoppingList::new("u1", "Groceries", ["Milk"]));

        assert_eq!(
            engine.on_connectivity_changed(ConnectivityState::Connected),
            Mode::Live
        );
        assert_eq!(engine.active_generation(), Some(1));
        assert_eq!(engine.process_pending(&mut deliveries), 1);

        assert_eq!(engine.current_lists().len(), 1);
        let cached = cache.read(DEFAULT_CACHE_KEY).unwrap();
        assert_eq!(cached.lists, engine.current_lists());
    }

    #[test]
    fn reconnecting_replaces_subscription() {
        let (mut engine, _deliveries, _, source) = test_engine();

        engine.on_connectivity_changed(ConnectivityState::Connected);
        engine.on_connectivity_changed(ConnectivityState::Connected);

        assert_eq!(source.subscriptions_opened(), 2);
        assert_eq!(source.active_subscriptions(), 1);
        assert_eq!(engine.active_generation(), Some(2));
    }

    #[test]
    fn unknown_keeps_mode() {
        let (mut engine, _deliveries, _, source) = test_engine();
        assert_eq!(
            engine.on_connectivity_changed(ConnectivityState::Unknown),
            Mode::Idle
        );

        engine.on_connectivity_changed(ConnectivityState::Connected);
        assert_eq!(
            engine.on_connectivity_changed(ConnectivityState::Unknown),
            Mode::Live
        );
        assert_eq!(source.active_subscriptions(), 1);
    }

    #[test]
    fn disconnected_reads_cache_once() {
        let (mut engine, _deliveries, cache, _) = test_engine();
        cache
            .write(
                DEFAULT_CACHE_KEY,
                &CacheSnapshot::new(vec![ShoppingList::new("u1", "Cached", ["Bread"]).with_id("L7")]),
            )
            .unwrap();

        assert_eq!(
            engine.on_connectivity_changed(ConnectivityState::Disconnected),
            Mode::Cached
        );
        assert_eq!(cache.read_count(), 1);
        assert_eq!(engine.current_lists()[0].name, "Cached");

        engine.on_connectivity_changed(ConnectivityState::Disconnected);
        assert_eq!(cache.read_count(), 2);
    }

    #[test]
    fn malformed_cache_degrades_to_empty() {
        let (mut engine, _deliveries, cache, _) = test_engine();
        cache.put_raw(DEFAULT_CACHE_KEY, "[{broken");

        engine.on_connectivity_changed(ConnectivityState::Disconnected);
        assert_eq!(engine.mode(), Mode::Cached);
        assert!(engine.current_lists().is_empty());
    }

    #[test]
    fn cached_lists_of_other_owners_are_dropped() {
        let (mut engine, _deliveries, cache, _) = test_engine();
        cache
            .write(
                DEFAULT_CACHE_KEY,
                &CacheSnapshot::new(vec![
                    ShoppingList::new("u1", "Mine", ["Milk"]),
                    ShoppingList::new("u2", "Theirs", ["Tea"]),
                ]),
            )
            .unwrap();

        engine.on_connectivity_changed(ConnectivityState::Disconnected);
        assert_eq!(engine.current_lists().len(), 1);
        assert_eq!(engine.current_lists()[0].name, "Mine");
    }

    #[test]
    fn snapshot_while_cached_is_ignored() {
        let (mut engine, _deliveries, _, _) = test_engine();
        engine.on_connectivity_changed(ConnectivityState::Disconnected);

        let applied = engine.on_remote_snapshot(Delivery {
            generation: 0,
            lists: vec![ShoppingList::new("u1", "Ghost", ["Boo"])],
        });
        assert!(!applied);
        assert!(engine.current_lists().is_empty());
    }

    #[test]
    fn cache_write_failure_still_publishes() {
        let (mut engine, mut deliveries, cache, source) = test_engine();
        let mut events = engine.subscribe_events();
        cache.set_fail_writes(true);
        source.insert(ShoppingList::new("u1", "Groceries", ["Milk"]));

        engine.on_connectivity_changed(ConnectivityState::Connected);
        engine.process_pending(&mut deliveries);

        assert_eq!(engine.current_lists().len(), 1);
        assert!(cache.raw(DEFAULT_CACHE_KEY).is_none());

        // One event for the transition, one for the snapshot
        assert!(events.try_recv().is_ok());
        let event = events.try_recv().unwrap();
        assert_eq!(event.lists().map(|l| l.len()), Some(1));
    }

    #[test]
    fn subscribe_failure_falls_back_to_cache() {
        let (mut engine, _deliveries, cache, source) = test_engine();
        source.set_fail_subscribes(true);
        cache
            .write(
                DEFAULT_CACHE_KEY,
                &CacheSnapshot::new(vec![ShoppingList::new("u1", "Cached", ["Bread"])]),
            )
            .unwrap();

        assert_eq!(
            engine.on_connectivity_changed(ConnectivityState::Connected),
            Mode::Cached
        );
        assert_eq!(engine.active_generation(), None);
        assert_eq!(engine.current_lists().len(), 1);
    }

    #[tokio::test]
    async fn submit_rejects_invalid_candidate_without_remote_call() {
        let (mut engine, _deliveries, _, source) = test_engine();
        let mut events = engine.subscribe_events();

        let result = engine
            .submit_new_list(ShoppingList::new("u1", "", ["Milk"]))
            .await;
        assert_eq!(result, Err(Error::EmptyName));

        let result = engine
            .submit_new_list(ShoppingList::new("u2", "Groceries", ["Milk"]))
            .await;
        assert!(matches!(result, Err(Error::OwnerMismatch { .. })));

        assert!(source.lists_for("u1").is_empty());
        assert!(source.lists_for("u2").is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn submit_is_attempted_while_cached() {
        let (mut engine, _deliveries, _, source) = test_engine();
        engine.on_connectivity_changed(ConnectivityState::Disconnected);

        let id = engine
            .submit_new_list(ShoppingList::new("u1", "Groceries", ["Milk"]))
            .await
            .unwrap();

        assert_eq!(id, "L1");
        assert_eq!(source.lists_for("u1").len(), 1);
        assert_eq!(engine.current_lists().len(), 1);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (mut engine, _deliveries, _, source) = test_engine();
        engine.on_connectivity_changed(ConnectivityState::Connected);

        engine.shutdown();
        engine.shutdown();

        assert_eq!(engine.mode(), Mode::Idle);
        assert_eq!(engine.active_generation(), None);
        assert_eq!(source.active_subscriptions(), 0);
    }

    #[test]
    fn drop_releases_subscription() {
        let (mut engine, _deliveries, _, source) = test_engine();
        engine.on_connectivity_changed(ConnectivityState::Connected);
        assert_eq!(source.active_subscriptions(), 1);

        drop(engine);
        assert_eq!(source.active_subscriptions(), 0);
    }
}
