use thiserror::Error;

/// Top-level error type for the `skillbridge-api` crate.
///
/// Covers both API surfaces: the REST store and the realtime feed.
/// `skillbridge-core` maps these into user-facing diagnostics; the
/// classification helpers below drive its retry policy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Store (REST) ────────────────────────────────────────────────
    /// The API key was rejected or the row-level policy denied access.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// No row matched the requested key.
    #[error("Not found: {resource}/{key}")]
    NotFound { resource: String, key: String },

    /// A uniqueness or foreign-key constraint rejected the write.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Any other structured error from the store.
    #[error("Store error (HTTP {status}): {message}")]
    Store {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Realtime feed ───────────────────────────────────────────────
    /// Websocket connection failed.
    #[error("Feed connection failed: {0}")]
    FeedConnect(String),

    /// The realtime client has been shut down; no new subscriptions.
    #[error("Realtime client is shut down")]
    FeedShutdown,
}

impl Error {
    /// Returns `true` if this is a transient failure worth retrying.
    ///
    /// Only read paths consult this; writes are never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } => true,
            Self::FeedConnect(_) => true,
            // 5xx from the store is a server-side hiccup
            Self::Store { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` if a constraint rejected the write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Extract the store's machine-readable error code, if available.
    pub fn store_error_code(&self) -> Option<&str> {
        match self {
            Self::Store { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
