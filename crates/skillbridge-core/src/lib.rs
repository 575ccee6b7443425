//! Data synchronization layer between `skillbridge-api` and UI consumers.
//!
//! This crate owns the business logic and local-state machinery for the
//! skill-exchange workspace:
//!
//! - **[`SyncedCollection<T>`]** — The core primitive: an ordered,
//!   key-unique view of one remote resource, seeded by a retried fetch,
//!   kept current by change-feed events, with optimistic entries for
//!   in-flight writes and an explicit [`resync`](SyncedCollection::resync)
//!   escape hatch for feed drift.
//!
//! - **[`RetryPolicy`]** — Fixed-delay, bounded retry for idempotent
//!   reads. Writes are never routed through it.
//!
//! - **View-level facades** — [`HomeBoard`] (opportunities + activity
//!   feed, with cross-resource completion filtering),
//!   [`NotificationCenter`], [`ChatRoom`], and [`UserSearch`] (debounced
//!   people search). Each owns its collections and releases its feed
//!   subscriptions on teardown.
//!
//! - **Domain model** ([`model`]) — Row types matching the store schema
//!   (`Opportunity`, `Activity`, `Notification`, `Message`, `Profile`),
//!   tied together by the [`Entity`] trait.

pub mod board;
pub mod chat;
pub mod config;
pub mod error;
pub mod model;
pub mod notifications;
pub mod retry;
pub mod search;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
// Consumers construct clients through `SessionConfig`; the types are
// re-exported so they don't need a direct skillbridge-api dependency.
pub use skillbridge_api::{RealtimeClient, StoreClient};

pub use board::{HomeBoard, ACTIVITY_FEED_LIMIT};
pub use chat::ChatRoom;
pub use config::SessionConfig;
pub use error::CoreError;
pub use notifications::NotificationCenter;
pub use retry::RetryPolicy;
pub use search::{PersonMatch, SearchDebouncer, UserSearch};
pub use sync::{CollectionOptions, SyncStatus, SyncedCollection};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Activity,
    Completion,
    CompletionStatus,
    Connection,
    ConnectionStatus,
    Entity,
    Message,
    NewConnection,
    NewMessage,
    Notification,
    Opportunity,
    Profile,
};
