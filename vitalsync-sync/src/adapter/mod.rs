//! External Health Store Adapter abstraction.
//!
//! Defines the contract the reconciler needs from the platform health store.
//! A platform adapter implements [`HealthStoreAdapter`] once per measurement
//! type; the reconciler is generic over it and never reaches a global
//! instance, so tests substitute [`mock::MockHealthStore`].

pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use vitalsync_types::{
    Anchor, AnchoredChanges, ExternalRecord, ExternalRecordId, HealthEntry, Measurement,
};

/// Result type for adapter calls.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Callback fired when the external store's data for a domain changes.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Errors reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Permission for this data type is absent.
    #[error("not authorized")]
    NotAuthorized,

    /// The platform store is not available on this device.
    #[error("health store unavailable: {0}")]
    Unavailable(String),

    /// A call failed while talking to the store.
    #[error("I/O error: {0}")]
    Io(String),

    /// A record could not be decoded.
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// The platform health store, seen from one domain.
///
/// Every call may be slow; callers run them off the main context.
#[async_trait]
pub trait HealthStoreAdapter<M: Measurement>: Send + Sync {
    /// Whether permission for this domain's data type is granted. This must
    /// be checked per data type: the platform grants each one separately.
    async fn is_authorized(&self) -> bool;

    /// Records changed since `anchor`. `None` returns everything currently
    /// present, with no deletions.
    async fn fetch_incremental(&self, anchor: Option<&Anchor>)
    -> AdapterResult<AnchoredChanges<M>>;

    /// Every record from `since` forward, including several records on the
    /// same day.
    async fn fetch_historical(&self, since: DateTime<Utc>) -> AdapterResult<Vec<ExternalRecord<M>>>;

    /// Writes a local entry outward and returns the new record's id.
    async fn write(&self, entry: &HealthEntry<M>) -> AdapterResult<ExternalRecordId>;

    /// Deletes a record from the external store.
    async fn delete(&self, id: &ExternalRecordId) -> AdapterResult<()>;

    /// Registers a callback fired whenever this domain's external data
    /// changes, whatever app or device made the change.
    fn observe(&self, on_change: ChangeCallback) -> AdapterResult<()>;
}
