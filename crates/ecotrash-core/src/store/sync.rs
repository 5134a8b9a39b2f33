// ── List/detail synchronization ──
//
// Keeps a screen's collection convergent with the server after every
// mutating operation, and filters it for the search box without touching
// the stored order.

use std::sync::Arc;

use tracing::debug;

use super::EntityCollection;
use crate::error::CoreError;
use crate::model::{Entity, EntityId};
use crate::service::EntityService;
use crate::stream::ListWatch;

/// What to do with the collection after a successful create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreatePolicy {
    /// Re-fetch the full list from the server.
    #[default]
    Refetch,
    /// Append the record returned by the server (re-fetch if none).
    AppendReturned,
}

/// Authoritative ordered list for one screen, plus its search term.
pub struct ListSynchronizer<T: Entity> {
    collection: EntityCollection<T>,
    policy: CreatePolicy,
    search: String,
}

impl<T: Entity> Default for ListSynchronizer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> ListSynchronizer<T> {
    pub fn new() -> Self {
        Self {
            collection: EntityCollection::new(),
            policy: CreatePolicy::default(),
            search: String::new(),
        }
    }

    pub fn with_policy(mut self, policy: CreatePolicy) -> Self {
        self.policy = policy;
        self
    }

    // ── Server events ───────────────────────────────────────────────

    /// Full fetch; the server's order wins.
    pub async fn refresh<S: EntityService<T>>(&mut self, source: &S) -> Result<(), CoreError> {
        let items = source.list().await?;
        debug!(kind = T::KIND, count = items.len(), "refreshed list");
        self.collection.upsert_and_prune(items);
        Ok(())
    }

    /// Apply a successful create according to the configured policy.
    pub async fn after_create<S: EntityService<T>>(
        &mut self,
        created: Option<T>,
        source: &S,
    ) -> Result<(), CoreError> {
        match (self.policy, created) {
            (CreatePolicy::AppendReturned, Some(entity)) => {
                debug!(kind = T::KIND, id = %entity.id(), "appending created record");
                self.collection.upsert(entity);
                Ok(())
            }
            _ => self.refresh(source).await,
        }
    }

    /// Replace the record in place when the server returned it, else
    /// re-fetch.
    pub async fn after_update<S: EntityService<T>>(
        &mut self,
        updated: Option<T>,
        source: &S,
    ) -> Result<(), CoreError> {
        match updated {
            Some(entity) => {
                debug!(kind = T::KIND, id = %entity.id(), "replacing updated record");
                self.collection.upsert(entity);
                Ok(())
            }
            None => self.refresh(source).await,
        }
    }

    /// Drop a deleted record locally; the next refresh is authoritative.
    pub fn after_delete(&mut self, id: &EntityId) {
        if self.collection.remove(id).is_none() {
            debug!(kind = T::KIND, %id, "deleted record was not in the list");
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Every record, in server order.
    pub fn items(&self) -> Arc<Vec<Arc<T>>> {
        self.collection.snapshot()
    }

    /// Records matching the search term (case-insensitive substring over
    /// each entity's display fields).
    pub fn visible(&self) -> Vec<Arc<T>> {
        self.items()
            .iter()
            .filter(|e| e.matches(&self.search))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &EntityId) -> Option<Arc<T>> {
        self.collection.get(id)
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Follow this list from a renderer.
    pub fn watch(&self) -> ListWatch<T> {
        ListWatch::new(self.collection.subscribe())
    }
}
