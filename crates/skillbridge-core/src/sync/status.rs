// ── Collection lifecycle status ──

/// Externally visible lifecycle state of a [`SyncedCollection`].
///
/// [`SyncedCollection`]: super::SyncedCollection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Seed fetch has not completed yet.
    Loading,
    /// Seeded and receiving feed events.
    Live,
    /// The seed fetch (or a resync) exhausted its retries. The snapshot
    /// holds whatever was last applied; `init`/`resync` may be retried.
    Errored { message: String },
    /// `teardown` was called; the collection no longer mutates.
    TornDown,
}

impl SyncStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, Self::Errored { .. })
    }
}
