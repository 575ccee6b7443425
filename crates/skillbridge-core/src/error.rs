// ── Core error types ──
//
// User-facing errors from skillbridge-core. Consumers never see HTTP
// status codes or JSON parse failures directly; the
// `From<skillbridge_api::Error>` impl translates transport-layer
// errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Synchronization lifecycle ────────────────────────────────────
    /// The collection was torn down while this operation was in flight;
    /// its result was discarded rather than applied.
    #[error("Collection is torn down")]
    TornDown,

    /// A caller broke a local precondition (e.g. reconciling an unknown
    /// temp key). Indicates a bug in the caller, never a network fault.
    #[error("Local invariant violated: {message}")]
    LocalInvariant { message: String },

    /// Opening the change-feed subscription failed.
    #[error("Feed subscription failed: {message}")]
    FeedSubscribe { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    // ── Backend errors (wrapped, not exposed raw) ────────────────────
    #[error("Backend error: {message}")]
    Backend {
        message: String,
        /// The store's machine-readable error code, when present.
        code: Option<String>,
        /// Whether the failure is worth retrying.
        transient: bool,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if retrying the same operation might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Backend {
                transient: true,
                ..
            } | Self::FeedSubscribe { .. }
        )
    }

    pub(crate) fn local_invariant(message: impl Into<String>) -> Self {
        Self::LocalInvariant {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<skillbridge_api::Error> for CoreError {
    fn from(err: skillbridge_api::Error) -> Self {
        use skillbridge_api::Error as ApiError;

        match err {
            ApiError::NotFound { resource, key } => Self::NotFound {
                entity: resource,
                key,
            },
            ApiError::PermissionDenied { message } => Self::PermissionDenied { message },
            ApiError::Conflict { message } => Self::Conflict { message },
            ApiError::FeedShutdown | ApiError::FeedConnect(_) => Self::FeedSubscribe {
                message: err.to_string(),
            },
            other => {
                let transient = other.is_transient();
                Self::Backend {
                    message: other.to_string(),
                    code: other.store_error_code().map(str::to_owned),
                    transient,
                }
            }
        }
    }
}
