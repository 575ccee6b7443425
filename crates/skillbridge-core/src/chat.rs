// ── Chat room ──
//
// A room's message transcript, oldest first. Sending shows the message
// immediately under a temporary key, then swaps in the stored row once
// the insert returns, or rolls back if it doesn't. Inserts are never
// retried; a duplicate message is worse than a failed one.

use chrono::Utc;
use skillbridge_api::{Filter, Order, Predicate, Query, RealtimeClient, StoreClient};
use tracing::warn;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Entity, Message, NewMessage};
use crate::sync::{oldest_first, CollectionOptions, SyncedCollection};

pub struct ChatRoom {
    room_id: String,
    user_id: String,
    store: StoreClient,
    collection: SyncedCollection<Message>,
}

impl ChatRoom {
    pub fn new(
        store: StoreClient,
        realtime: RealtimeClient,
        room_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let room_id = room_id.into();
        let query = Query::new()
            .filter(Filter::new().eq("room_id", &room_id))
            .order(Order::asc("created_at"));
        let options = CollectionOptions::default()
            .with_comparator(oldest_first())
            .with_feed_filter(Predicate::Eq {
                field: "room_id".into(),
                value: room_id.clone(),
            });
        let collection = SyncedCollection::new(store.clone(), realtime, query, options);

        Self {
            room_id,
            user_id: user_id.into(),
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

    pub fn messages(&self) -> &SyncedCollection<Message> {
        &self.collection
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Send a message: optimistic entry, store insert, reconcile.
    ///
    /// On failure the optimistic entry is rolled back and the send
    /// error is returned; the caller re-offers the text to the user.
    pub async fn send(&self, content: impl Into<String>) -> Result<Message, CoreError> {
        let content = content.into();
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::local_invariant("empty message"));
        }

        let temp_key = format!("temp-{}", Uuid::new_v4());
        self.collection.add_optimistic(Message {
            id: temp_key.clone(),
            room_id: self.room_id.clone(),
            sender_id: self.user_id.clone(),
            content: content.to_owned(),
            created_at: Utc::now(),
        })?;

        let body = NewMessage {
            room_id: self.room_id.clone(),
            sender_id: self.user_id.clone(),
            content: content.to_owned(),
        };
        match self.store.insert::<Message, _>(Message::RESOURCE, &body).await {
            Ok(confirmed) => {
                self.collection.reconcile(&temp_key, confirmed.clone())?;
                Ok(confirmed)
            }
            Err(err) => {
                // Roll back without masking the send error.
                if let Err(rollback_err) = self.collection.rollback(&temp_key) {
                    warn!(%temp_key, error = %rollback_err, "rollback after failed send");
                }
                Err(err.into())
            }
        }
    }
}
