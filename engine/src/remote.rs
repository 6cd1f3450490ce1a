//! Remote list source contract.
//!
//! The remote source is a real-time collection of lists filtered by owner.
//! Every subscription delivers the full matching set when it opens and again
//! after each committed change. Deliveries are pushed into the engine's
//! channel tagged with the generation of the subscription that produced them,
//! so the engine can drop anything from a subscription it no longer owns.

use crate::{error::Result, Error, Generation, ListId, OwnerId, ShoppingList};
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A full snapshot delivered by one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Generation of the subscription that produced this snapshot
    pub generation: Generation,
    /// The complete set of matching lists
    pub lists: Vec<ShoppingList>,
}

/// Receiving end of the engine's delivery channel.
pub type Deliveries = mpsc::UnboundedReceiver<Delivery>;

/// Where a subscription pushes its snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<Delivery>,
}

impl SnapshotSink {
    pub fn new(generation: Generation, tx: mpsc::UnboundedSender<Delivery>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Push a snapshot. Returns false if the engine side has gone away.
    pub fn deliver(&self, lists: Vec<ShoppingList>) -> bool {
        self.tx
            .send(Delivery {
                generation: self.generation,
                lists,
            })
            .is_ok()
    }
}

/// Opaque handle identifying one open subscription at the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A real-time, owner-scoped collection of shopping lists.
pub trait RemoteListSource {
    /// Open a subscription to every list owned by `owner_id`.
    fn subscribe(&self, owner_id: &str, sink: SnapshotSink) -> Result<SubscriptionHandle>;

    /// Stop delivery for `handle`. Calling this more than once is harmless.
    fn cancel(&self, handle: &SubscriptionHandle);

    /// Persist a new list and return its assigned identifier.
    fn create(&self, list: &ShoppingList) -> impl Future<Output = Result<ListId>> + Send;
}

impl<T: RemoteListSource> RemoteListSource for Arc<T> {
    fn subscribe(&self, owner_id: &str, sink: SnapshotSink) -> Result<SubscriptionHandle> {
        (**self).subscribe(owner_id, sink)
    }

    fn cancel(&self, handle: &SubscriptionHandle) {
        (**self).cancel(handle)
    }

    fn create(&self, list: &ShoppingList) -> impl Future<Output = Result<ListId>> + Send {
        (**self).create(list)
    }
}

#[derive(Debug)]
struct Subscriber {
    owner_id: OwnerId,
    sink: SnapshotSink,
}

/// In-process remote list source.
///
/// Assigns ids `L1`, `L2`, ... in creation order and notifies every
/// subscription of the affected owner synchronously. Thread-safe and can be
/// shared via `Arc`.
#[derive(Debug, Default)]
pub struct MemoryRemoteSource {
    records: DashMap<OwnerId, Vec<ShoppingList>>,
    subscriptions: DashMap<u64, Subscriber>,
    next_handle: AtomicU64,
    next_id: AtomicU64,
    fail_creates: AtomicBool,
    fail_subscribes: AtomicBool,
    opened: AtomicUsize,
}

impl MemoryRemoteSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty source wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make subsequent creates fail (or succeed again).
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent subscribes fail (or succeed again).
    pub fn set_fail_subscribes(&self, fail: bool) {
        self.fail_subscribes.store(fail, Ordering::SeqCst);
    }

    /// Store a list as if another device had created it. Lists without an id
    /// get one assigned. Subscribers of the owner are notified.
    pub fn insert(&self, list: ShoppingList) -> ListId {
        let id = match &list.id {
            Some(id) => id.clone(),
            None => self.allocate_id(),
        };
        let owner_id = list.owner_id.clone();
        self.records
            .entry(owner_id.clone())
            .or_default()
            .push(list.with_id(id.clone()));
        self.notify(&owner_id);
        id
    }

    /// Remove a list as if another device had deleted it.
    pub fn remove(&self, owner_id: &str, id: &str) -> bool {
        let removed = match self.records.get_mut(owner_id) {
            Some(mut lists) => {
                let before = lists.len();
                lists.retain(|l| l.id.as_deref() != Some(id));
                lists.len() != before
            }
            None => false,
        };
        if removed {
            self.notify(owner_id);
        }
        removed
    }

    /// All lists stored for `owner_id`.
    pub fn lists_for(&self, owner_id: &str) -> Vec<ShoppingList> {
        self.records
            .get(owner_id)
            .map(|lists| lists.clone())
            .unwrap_or_default()
    }

    /// Number of subscriptions currently open.
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Number of subscriptions ever opened.
    pub fn subscriptions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> ListId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("L{}", n)
    }

    fn notify(&self, owner_id: &str) {
        let lists = self.lists_for(owner_id);
        let mut sent = 0;
        for entry in self.subscriptions.iter() {
            let sub = entry.value();
            if sub.owner_id == owner_id && sub.sink.deliver(lists.clone()) {
                sent += 1;
            }
        }
        tracing::trace!(owner_id, subscribers = sent, "Delivered snapshot");
    }
}

impl RemoteListSource for MemoryRemoteSource {
    fn subscribe(&self, owner_id: &str, sink: SnapshotSink) -> Result<SubscriptionHandle> {
        if self.fail_subscribes.load(Ordering::SeqCst) {
            return Err(Error::Subscribe("remote source unavailable".into()));
        }

        let handle = SubscriptionHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        sink.deliver(self.lists_for(owner_id));
        self.subscriptions.insert(
            handle.id(),
            Subscriber {
                owner_id: owner_id.to_string(),
                sink,
            },
        );
        self.opened.fetch_add(1, Ordering::SeqCst);

        Ok(handle)
    }

    fn cancel(&self, handle: &SubscriptionHandle) {
        self.subscriptions.remove(&handle.id());
    }

    async fn create(&self, list: &ShoppingList) -> Result<ListId> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Error::RemoteWrite("create rejected by remote source".into()));
        }
        Ok(self.insert(list.clone()))
    }
}
