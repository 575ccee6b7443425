// ── Domain model ──
//
// Canonical row types for the skill-exchange schema. Field names match
// the store's snake_case columns so rows deserialize straight off the
// wire, both from REST fetches and from change-feed payloads.

mod activity;
mod message;
mod notification;
mod opportunity;
mod social;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

pub use activity::Activity;
pub use message::{Message, NewMessage};
pub use notification::Notification;
pub use opportunity::{Completion, CompletionStatus, Opportunity};
pub use social::{Connection, ConnectionStatus, NewConnection, Profile};

/// A row type that a [`SyncedCollection`](crate::SyncedCollection) can own.
///
/// Keys are unique strings within a resource; `created_at` is the
/// default sort key (collections may override the comparator).
pub trait Entity: Clone + Send + Sync + DeserializeOwned + 'static {
    /// The store resource (table) this type lives in.
    const RESOURCE: &'static str;

    /// Unique row key.
    fn key(&self) -> &str;

    /// Creation timestamp, the default ordering field.
    fn created_at(&self) -> DateTime<Utc>;
}
