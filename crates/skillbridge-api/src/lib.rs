//! Async client for the skillbridge hosted backend.
//!
//! Two surfaces, both thin translation boundaries with no business logic:
//!
//! - **[`StoreClient`]** — typed CRUD over the backend's REST query
//!   interface. Filters, ordering, and limits are expressed through
//!   [`Query`] and rendered into the store's query-parameter grammar.
//!   Errors are classified ([`Error::is_transient`] etc.) but never
//!   retried here — retry policy belongs to the caller.
//!
//! - **[`RealtimeClient`]** — long-lived websocket connection delivering
//!   insert/update/delete [`ChangeEvent`]s per subscribed resource, with
//!   automatic reconnection. Reconnects may drop events silently; callers
//!   that need a coherent view must pair the feed with a re-fetch.

pub mod error;
pub mod query;
pub mod realtime;
pub mod store;
pub mod transport;

pub use error::Error;
pub use query::{Direction, Filter, Order, Predicate, Query};
pub use realtime::{
    ChangeEvent, ChangeKind, FeedSubscription, RealtimeClient, ReconnectConfig,
};
pub use store::StoreClient;
pub use transport::TransportConfig;
