// ── Ordered reactive entity collection ──
//
// Insertion-ordered storage keyed by primary key, with push-based change
// notification via a `watch` channel. Mutation goes through `&mut self`;
// readers only ever see published snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::watch;

use crate::model::{Entity, EntityId};

pub(crate) type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// An ordered collection for a single entity type.
///
/// Every mutation bumps a version counter and rebuilds the snapshot that
/// subscribers receive.
pub(crate) struct EntityCollection<T: Entity> {
    items: IndexMap<EntityId, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot in display order.
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Entity> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            items: IndexMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or replace an entity. Existing keys keep their position; new
    /// keys are appended. Returns `true` if the key was new.
    pub(crate) fn upsert(&mut self, entity: T) -> bool {
        let is_new = self.insert_quiet(entity);
        self.publish();
        is_new
    }

    /// Remove an entity by id. Returns the removed entity if it existed.
    pub(crate) fn remove(&mut self, id: &EntityId) -> Option<Arc<T>> {
        let removed = self.items.shift_remove(id);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Replace the contents with `incoming`, in its order.
    ///
    /// Upserts every incoming entity, prunes ids absent from the incoming
    /// set, then reorders. Subscribers see a single change and never an
    /// intermediate empty state.
    pub(crate) fn upsert_and_prune(&mut self, incoming: Vec<T>) {
        let order: HashMap<EntityId, usize> = incoming
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.id(), pos))
            .collect();
        let stale: Vec<EntityId> = self
            .items
            .keys()
            .filter(|id| !order.contains_key(*id))
            .cloned()
            .collect();
        for entity in incoming {
            self.insert_quiet(entity);
        }
        for id in &stale {
            self.items.shift_remove(id);
        }
        self.items
            .sort_by_cached_key(|id, _| order.get(id).copied().unwrap_or(usize::MAX));

        self.publish();
    }

    pub(crate) fn get(&self, id: &EntityId) -> Option<Arc<T>> {
        self.items.get(id).cloned()
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn insert_quiet(&mut self, entity: T) -> bool {
        self.items.insert(entity.id(), Arc::new(entity)).is_none()
    }

    /// Rebuild the snapshot, broadcast it, and bump the version.
    fn publish(&self) {
        let values: Vec<Arc<T>> = self.items.values().cloned().collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}
