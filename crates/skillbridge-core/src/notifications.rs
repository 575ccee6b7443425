// ── Notification center ──
//
// One user's notification list: seeded and fed like any collection,
// narrowed to the current user on both the query and the feed. Writes
// patch the local row first and revert if the store rejects them;
// they are never retried.

use serde_json::json;
use skillbridge_api::{Filter, Order, Query, RealtimeClient, StoreClient};
use tracing::warn;

use crate::error::CoreError;
use crate::model::{Entity, Notification};
use crate::sync::{CollectionOptions, SyncedCollection};

pub struct NotificationCenter {
    user_id: String,
    store: StoreClient,
    collection: SyncedCollection<Notification>,
}

impl NotificationCenter {
    pub fn new(store: StoreClient, realtime: RealtimeClient, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let query = Query::new()
            .filter(Filter::new().eq("user_id", &user_id))
            .order(Order::desc("created_at"));
        let options = CollectionOptions::default().with_feed_filter(
            skillbridge_api::Predicate::Eq {
                field: "user_id".into(),
                value: user_id.clone(),
            },
        );
        let collection = SyncedCollection::new(store.clone(), realtime, query, options);

        Self {
            user_id,
            store,
            collection,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub async fn init(&self) -> Result<(), CoreError> {
        self.collection.init().await
    }

    pub async fn resync(&self) -> Result<(), CoreError> {
        self.collection.resync().await
    }

    pub fn teardown(&self) {
        self.collection.teardown();
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn notifications(&self) -> &SyncedCollection<Notification> {
        &self.collection
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn unread_count(&self) -> usize {
        self.collection
            .snapshot()
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Mark one notification read. The local row flips immediately;
    /// a store rejection flips it back and surfaces the error.
    pub async fn mark_read(&self, id: &str) -> Result<(), CoreError> {
        let Some(current) = self.collection.get(id) else {
            return Err(CoreError::NotFound {
                entity: Notification::RESOURCE.to_owned(),
                key: id.to_owned(),
            });
        };
        if current.read {
            return Ok(());
        }

        let mut patched = current.clone();
        patched.read = true;
        self.collection.apply_local_update(patched);

        let result: Result<Notification, _> = self
            .store
            .update(Notification::RESOURCE, id, &json!({ "read": true }))
            .await;
        match result {
            Ok(confirmed) => {
                self.collection.apply_local_update(confirmed);
                Ok(())
            }
            Err(err) => {
                warn!(id, error = %err, "mark_read rejected, reverting local row");
                self.collection.apply_local_update(current);
                Err(err.into())
            }
        }
    }

    /// Mark every unread notification read, stopping at the first
    /// rejection.
    pub async fn mark_all_read(&self) -> Result<(), CoreError> {
        let unread: Vec<String> = self
            .collection
            .snapshot()
            .iter()
            .filter(|n| !n.read)
            .map(|n| n.id.clone())
            .collect();

        for id in unread {
            self.mark_read(&id).await?;
        }
        Ok(())
    }

    /// Remove one notification. Local removal happens first; a store
    /// rejection restores the row.
    pub async fn dismiss(&self, id: &str) -> Result<(), CoreError> {
        let Some(current) = self.collection.get(id) else {
            return Err(CoreError::NotFound {
                entity: Notification::RESOURCE.to_owned(),
                key: id.to_owned(),
            });
        };

        self.collection.remove_local(id);

        match self.store.delete(Notification::RESOURCE, id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(id, error = %err, "dismiss rejected, restoring local row");
                self.collection.apply_local_insert(current);
                Err(err.into())
            }
        }
    }
}
