//! Sync status and pass reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitalsync_types::Domain;

/// User-visible sync state of one domain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Nothing has been synced in this session yet.
    #[default]
    Stale,
    /// A pass is in flight.
    Syncing,
    /// The last pass succeeded.
    Synced { at: DateTime<Utc> },
    /// The last pass was rejected or could not be persisted.
    Failed { reason: String },
    /// The external store could not be reached.
    Unavailable { reason: String },
}

/// Which reconciliation mode a pass ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Anchored delta, triggered by the observer or periodically.
    Incremental,
    /// User-requested import of all history.
    HistoricalImport,
    /// User-requested full comparison with deletion reconciliation.
    ResetAndReconcile,
}

/// Why a pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    SyncDisabled,
    NotAuthorized,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub domain: Domain,
    pub mode: SyncMode,
    /// Entries inserted into the local store.
    pub added: usize,
    /// Entries removed from the local store.
    pub removed: usize,
    /// External records that matched more than one local entry.
    pub ambiguous: usize,
    pub skipped: Option<SkipReason>,
}

impl ReconcileReport {
    pub(crate) fn new(domain: Domain, mode: SyncMode) -> Self {
        Self {
            domain,
            mode,
            added: 0,
            removed: 0,
            ambiguous: 0,
            skipped: None,
        }
    }

    pub(crate) fn skipped(domain: Domain, mode: SyncMode, reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::new(domain, mode)
        }
    }

    /// Whether the local store changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}
