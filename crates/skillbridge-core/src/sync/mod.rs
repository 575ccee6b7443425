// ── Synchronized collections ──
//
// A `SyncedCollection` keeps a locally-coherent, order-preserving view
// of one remote resource: a seed fetch populates it, change-feed events
// keep it current, optimistic entries bridge the write round-trip, and
// `resync` re-pulls from the store when feed drift is suspected.

mod collection;
mod state;
mod status;

pub use collection::{CollectionOptions, SyncedCollection};
pub use status::SyncStatus;

use std::cmp::Ordering;
use std::sync::Arc;

use crate::model::Entity;

/// Ordering function for a collection's snapshot.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Reverse-chronological by creation time, key as tie-breaker so the
/// order is total and stable across merges.
pub fn newest_first<T: Entity>() -> Comparator<T> {
    Arc::new(|a: &T, b: &T| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.key().cmp(b.key()))
    })
}

/// Oldest-first, for chat transcripts.
pub fn oldest_first<T: Entity>() -> Comparator<T> {
    Arc::new(|a: &T, b: &T| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.key().cmp(b.key()))
    })
}
