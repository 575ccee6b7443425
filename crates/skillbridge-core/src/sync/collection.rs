// ── Synchronized collection ──
//
// Glues the pure `CollectionState` to the transport crate: a retried
// seed fetch, a pumped feed subscription, and `watch`-published
// snapshots. One instance owns one resource view; the store client and
// realtime client behind it are shared and stateless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use skillbridge_api::{ChangeEvent, ChangeKind, FeedSubscription, Predicate, Query, RealtimeClient, StoreClient};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::Entity;
use crate::retry::RetryPolicy;

use super::state::CollectionState;
use super::status::SyncStatus;
use super::{newest_first, Comparator};

// ── Options ──────────────────────────────────────────────────────────

/// Per-collection tuning. The defaults fit most list views: newest
/// rows first, unbounded length, the standard seed retry schedule, and
/// a feed subscription covering the whole resource.
pub struct CollectionOptions<T: Entity> {
    pub comparator: Comparator<T>,
    pub max_len: Option<usize>,
    pub retry: RetryPolicy,
    /// Narrows the feed subscription; independent of the seed query's
    /// filter, which the store applies server-side.
    pub feed_filter: Option<Predicate>,
}

impl<T: Entity> Default for CollectionOptions<T> {
    fn default() -> Self {
        Self {
            comparator: newest_first(),
            max_len: None,
            retry: RetryPolicy::default(),
            feed_filter: None,
        }
    }
}

impl<T: Entity> CollectionOptions<T> {
    pub fn with_comparator(mut self, comparator: Comparator<T>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_feed_filter(mut self, filter: Predicate) -> Self {
        self.feed_filter = Some(filter);
        self
    }
}

// ── SyncedCollection ─────────────────────────────────────────────────

struct Inner<T: Entity> {
    state: Mutex<CollectionState<T>>,
    snapshot: watch::Sender<Arc<Vec<T>>>,
    status: watch::Sender<SyncStatus>,
    torn_down: AtomicBool,
    subscribed: AtomicBool,
    cancel: CancellationToken,
}

/// A locally-coherent, order-preserving view of one remote resource.
///
/// Cheaply cloneable; clones share the same state and subscription.
pub struct SyncedCollection<T: Entity> {
    inner: Arc<Inner<T>>,
    store: StoreClient,
    realtime: RealtimeClient,
    query: Query,
    feed_filter: Option<Predicate>,
    retry: RetryPolicy,
}

impl<T: Entity> Clone for SyncedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            store: self.store.clone(),
            realtime: self.realtime.clone(),
            query: self.query.clone(),
            feed_filter: self.feed_filter.clone(),
            retry: self.retry,
        }
    }
}

impl<T: Entity> SyncedCollection<T> {
    pub fn new(
        store: StoreClient,
        realtime: RealtimeClient,
        query: Query,
        options: CollectionOptions<T>,
    ) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (status, _) = watch::channel(SyncStatus::Loading);

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CollectionState::new(options.comparator, options.max_len)),
                snapshot,
                status,
                torn_down: AtomicBool::new(false),
                subscribed: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
            store,
            realtime,
            query,
            feed_filter: options.feed_filter,
            retry: options.retry,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Seed the snapshot and open the feed subscription.
    ///
    /// The seed fetch runs under the retry policy; if it still fails,
    /// the collection is left empty in the `Errored` state and `init`
    /// may be called again. A seed that resolves after [`teardown`]
    /// is discarded, never applied.
    ///
    /// [`teardown`]: Self::teardown
    pub async fn init(&self) -> Result<(), CoreError> {
        self.ensure_active()?;
        self.inner.set_status(SyncStatus::Loading);

        let rows = self.fetch_seed().await;
        if self.inner.torn_down.load(Ordering::SeqCst) {
            return Err(CoreError::TornDown);
        }
        let rows = match rows {
            Ok(rows) => rows,
            Err(err) => {
                self.inner.set_status(SyncStatus::Errored {
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        self.inner.mutate(|state| state.merge_refresh(rows));

        // One subscription per collection, opened on the first
        // successful init and held until teardown.
        if !self.inner.subscribed.swap(true, Ordering::SeqCst) {
            match self
                .realtime
                .subscribe(T::RESOURCE, self.feed_filter.clone())
                .await
            {
                Ok(subscription) => self.spawn_pump(subscription),
                Err(err) => {
                    self.inner.subscribed.store(false, Ordering::SeqCst);
                    let err = CoreError::from(err);
                    self.inner.set_status(SyncStatus::Errored {
                        message: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }

        self.inner.set_status(SyncStatus::Live);
        Ok(())
    }

    /// Re-run the seed fetch and merge the result, without touching the
    /// feed subscription. The recovery path for suspected feed drift.
    pub async fn resync(&self) -> Result<(), CoreError> {
        self.ensure_active()?;

        let rows = self.fetch_seed().await;
        if self.inner.torn_down.load(Ordering::SeqCst) {
            return Err(CoreError::TornDown);
        }
        match rows {
            Ok(rows) => {
                self.inner.mutate(|state| state.merge_refresh(rows));
                self.inner.set_status(SyncStatus::Live);
                Ok(())
            }
            Err(err) => {
                self.inner.set_status(SyncStatus::Errored {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Release the feed subscription and freeze the collection.
    /// Idempotent; safe to call from any exit path.
    pub fn teardown(&self) {
        if !self.inner.torn_down.swap(true, Ordering::SeqCst) {
            self.inner.cancel.cancel();
            self.inner.set_status(SyncStatus::TornDown);
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<Arc<Vec<T>>> {
        self.inner.snapshot.subscribe()
    }

    /// Snapshot changes as a `Stream`, for consumers that iterate
    /// rather than poll a `watch` receiver.
    pub fn snapshot_stream(&self) -> WatchStream<Arc<Vec<T>>> {
        WatchStream::new(self.inner.snapshot.subscribe())
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn len(&self) -> usize {
        self.inner.lock_state().len()
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.inner.lock_state().get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Event application ────────────────────────────────────────────

    /// Apply one feed event. Mismatches (unknown keys, undecodable
    /// rows) are no-ops: the feed is at-least-once and best-effort
    /// ordered, so they are expected, not exceptional.
    pub fn apply_event(&self, event: &ChangeEvent) {
        self.inner.apply_event(event);
    }

    // ── Local patches ────────────────────────────────────────────────
    //
    // Same semantics as the corresponding feed events, used by callers
    // that patch locally ahead of a write and revert on failure.

    pub(crate) fn apply_local_update(&self, row: T) {
        self.inner.mutate(|state| state.update(row));
    }

    pub(crate) fn apply_local_insert(&self, row: T) {
        self.inner.mutate(|state| state.insert(row));
    }

    pub(crate) fn remove_local(&self, key: &str) {
        self.inner.mutate(|state| state.delete(key));
    }

    // ── Optimistic entries ───────────────────────────────────────────

    /// Show a client-authored row before its write round-trip finishes.
    pub fn add_optimistic(&self, row: T) -> Result<(), CoreError> {
        self.ensure_active()?;
        self.inner.try_mutate(|state| state.add_optimistic(row))
    }

    /// Replace the optimistic entry with the server-confirmed row,
    /// keeping its position in the snapshot.
    pub fn reconcile(&self, temp_key: &str, confirmed: T) -> Result<(), CoreError> {
        self.ensure_active()?;
        self.inner
            .try_mutate(|state| state.reconcile(temp_key, confirmed))
    }

    /// Remove the optimistic entry after a failed write.
    pub fn rollback(&self, temp_key: &str) -> Result<(), CoreError> {
        self.ensure_active()?;
        self.inner.try_mutate(|state| state.rollback(temp_key))
    }

    // ── Cross-resource exclusion ─────────────────────────────────────

    /// Bar a key from this snapshot on behalf of a companion resource.
    /// Persistent: a later insert for the key is dropped too, so the
    /// exclusion tolerates any delivery order across the two feeds.
    pub fn exclude(&self, key: &str) {
        self.inner.mutate(|state| state.exclude(key));
    }

    /// Lift an exclusion. The row returns via a later event or resync.
    pub fn readmit(&self, key: &str) {
        self.inner.mutate(|state| state.readmit(key));
    }

    // ── Private ──────────────────────────────────────────────────────

    fn ensure_active(&self) -> Result<(), CoreError> {
        if self.inner.torn_down.load(Ordering::SeqCst) {
            Err(CoreError::TornDown)
        } else {
            Ok(())
        }
    }

    async fn fetch_seed(&self) -> Result<Vec<T>, CoreError> {
        self.retry
            .run(|| async {
                self.store
                    .fetch::<T>(T::RESOURCE, &self.query)
                    .await
                    .map_err(CoreError::from)
            })
            .await
    }

    fn spawn_pump(&self, mut subscription: FeedSubscription) {
        let inner = Arc::downgrade(&self.inner);
        let cancel = self.inner.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = subscription.recv() => {
                        let Some(event) = event else { break };
                        let Some(inner) = inner.upgrade() else { break };
                        inner.apply_event(&event);
                    }
                }
            }
            // Dropping the handle leaves the topic.
            subscription.unsubscribe();
        });
    }
}

impl<T: Entity> Inner<T> {
    fn apply_event(&self, event: &ChangeEvent) {
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let Some(row) = event.decode::<T>() else {
                    debug!(resource = T::RESOURCE, "ignoring undecodable feed row");
                    return;
                };
                if event.kind == ChangeKind::Insert {
                    self.mutate(|state| state.insert(row));
                } else {
                    self.mutate(|state| state.update(row));
                }
            }
            ChangeKind::Delete => {
                let Some(key) = event.key() else {
                    warn!(resource = T::RESOURCE, "delete event without a key");
                    return;
                };
                let key = key.to_owned();
                self.mutate(|state| state.delete(&key));
            }
        }
    }

    /// Poison-tolerant lock: state mutations never panic, so a poisoned
    /// guard still holds a coherent snapshot.
    fn lock_state(&self) -> std::sync::MutexGuard<'_, CollectionState<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut CollectionState<T>)) {
        let mut state = self.lock_state();
        f(&mut state);
        let snap = state.snapshot();
        drop(state);
        self.snapshot.send_modify(|current| *current = snap);
    }

    fn try_mutate(
        &self,
        f: impl FnOnce(&mut CollectionState<T>) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        let mut state = self.lock_state();
        f(&mut state)?;
        let snap = state.snapshot();
        drop(state);
        self.snapshot.send_modify(|current| *current = snap);
        Ok(())
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_modify(|current| *current = status);
    }
}
