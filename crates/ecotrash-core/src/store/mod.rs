// ── List state ──
//
// One ordered, reactive collection per screen, kept in step with the
// server by the list synchronizer.

mod collection;
mod sync;

pub(crate) use collection::{EntityCollection, Snapshot};
pub use sync::{CreatePolicy, ListSynchronizer};
