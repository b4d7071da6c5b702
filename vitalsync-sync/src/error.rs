//! Error types for the sync layer.

use thiserror::Error;
use vitalsync_storage::StorageError;
use vitalsync_types::Domain;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can come out of a reconciliation pass or a write-through.
///
/// Adapter failures never cross the reconciler boundary as-is: they are
/// mapped onto the first three variants.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Permission for the domain is absent or was revoked.
    #[error("not authorized for {domain}")]
    NotAuthorized { domain: Domain },

    /// The external health store cannot be reached on this device.
    #[error("health store unavailable for {domain}: {reason}")]
    AdapterUnavailable { domain: Domain, reason: String },

    /// A fetched batch contained records that could not be applied. The
    /// whole batch was rejected.
    #[error("rejected {domain} batch ({rejected} invalid records): {reason}")]
    PartialBatchFailure {
        domain: Domain,
        rejected: usize,
        reason: String,
    },

    /// Local persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The main execution context has shut down.
    #[error("main context closed")]
    MainContextClosed,

    /// The main execution context thread could not be started.
    #[error("failed to start main context: {0}")]
    MainContextSpawn(String),

    /// Observer registration needs a running tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    /// No local entry with that identity.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// A locally created entry failed validation.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
}

impl SyncError {
    /// Whether the next trigger may succeed without user action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AdapterUnavailable { .. } | Self::PartialBatchFailure { .. } | Self::Storage(_)
        )
    }
}
