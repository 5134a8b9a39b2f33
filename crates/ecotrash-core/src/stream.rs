// ── List watches ──
//
// Read side of a screen's list for renderers that redraw on change. A
// watch carries its own search term so several views can filter one list
// differently.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{Entity, EntityId};
use crate::store::Snapshot;

/// Follows one `ListSynchronizer`'s published snapshots.
pub struct ListWatch<T: Entity> {
    receiver: watch::Receiver<Snapshot<T>>,
    search: String,
}

impl<T: Entity> ListWatch<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot<T>>) -> Self {
        Self {
            receiver,
            search: String::new(),
        }
    }

    /// Filter what `rows` returns. Does not affect the list itself.
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    /// Latest published snapshot, in server order.
    pub fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    /// Rows matching this watch's search term.
    pub fn rows(&self) -> Vec<Arc<T>> {
        self.matching(&self.snapshot())
    }

    pub fn find(&self, id: &EntityId) -> Option<Arc<T>> {
        self.receiver.borrow().iter().find(|e| &e.id() == id).cloned()
    }

    /// Wait for the list to change and return the new matching rows.
    /// `None` once the list is gone.
    pub async fn changed(&mut self) -> Option<Vec<Arc<T>>> {
        self.receiver.changed().await.ok()?;
        let snapshot = self.receiver.borrow_and_update().clone();
        Some(self.matching(&snapshot))
    }

    fn matching(&self, items: &[Arc<T>]) -> Vec<Arc<T>> {
        items
            .iter()
            .filter(|e| e.matches(&self.search))
            .cloned()
            .collect()
    }
}
