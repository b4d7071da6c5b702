//! Health entries, external records and anchors.
//!
//! A [`HealthEntry`] is what the local store holds and the UI renders. An
//! [`ExternalRecord`] is what the external health store hands back from a
//! fetch. Entries are never edited in place: an edit is a removal followed
//! by an insertion.

use crate::{EntryId, ExternalRecordId, HydrationValue, Measurement, SleepValue, WeightValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a local entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Entered by the user on this device.
    Manual,
    /// Imported from the external health store.
    ExternalSynced,
    /// Created by another integration writing into the local store.
    OtherIntegration,
}

/// A single health entry in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEntry<M> {
    pub id: EntryId,
    pub timestamp: DateTime<Utc>,
    pub value: M,
    pub provenance: Provenance,
    /// Record id a manual entry received when it was written outward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<ExternalRecordId>,
}

pub type WeightEntry = HealthEntry<WeightValue>;
pub type SleepEntry = HealthEntry<SleepValue>;
pub type HydrationEntry = HealthEntry<HydrationValue>;

impl<M: Measurement> HealthEntry<M> {
    /// Creates a manual entry with a fresh local id.
    #[must_use]
    pub fn manual(timestamp: DateTime<Utc>, value: M) -> Self {
        Self {
            id: EntryId::new(),
            timestamp,
            value,
            provenance: Provenance::Manual,
            external_id: None,
        }
    }

    /// Creates an entry owned by another integration.
    #[must_use]
    pub fn from_integration(id: EntryId, timestamp: DateTime<Utc>, value: M) -> Self {
        Self {
            id,
            timestamp,
            value,
            provenance: Provenance::OtherIntegration,
            external_id: None,
        }
    }

    /// Creates an external-synced entry whose identity is the record id.
    #[must_use]
    pub fn from_external(record: ExternalRecord<M>) -> Self {
        Self {
            id: EntryId::from(record.id),
            timestamp: record.timestamp,
            value: record.value,
            provenance: Provenance::ExternalSynced,
            external_id: None,
        }
    }

    /// Only external-synced entries may be removed by deletion
    /// reconciliation.
    #[must_use]
    pub fn is_reconcilable(&self) -> bool {
        self.provenance == Provenance::ExternalSynced
    }

    /// The external record this entry corresponds to, if any.
    #[must_use]
    pub fn linked_record(&self) -> Option<ExternalRecordId> {
        match self.provenance {
            Provenance::ExternalSynced => Some(ExternalRecordId::from(&self.id)),
            _ => self.external_id.clone(),
        }
    }

    /// Returns a copy linked to the given external record.
    #[must_use]
    pub fn with_external_id(mut self, external_id: ExternalRecordId) -> Self {
        self.external_id = Some(external_id);
        self
    }

    /// Validates the entry's value at its timestamp.
    pub fn validate(&self) -> crate::Result<()> {
        self.value
            .validate(self.timestamp)
            .map_err(crate::Error::InvalidValue)
    }
}

/// A record as returned by the external health store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRecord<M> {
    pub id: ExternalRecordId,
    pub timestamp: DateTime<Utc>,
    pub value: M,
    /// Bundle identifier of the app that wrote the record, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl<M: Measurement> ExternalRecord<M> {
    #[must_use]
    pub fn new(id: ExternalRecordId, timestamp: DateTime<Utc>, value: M) -> Self {
        Self {
            id,
            timestamp,
            value,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.value
            .validate(self.timestamp)
            .map_err(|reason| crate::Error::InvalidValue(format!("record {}: {reason}", self.id)))
    }
}

/// Opaque fetch cursor handed out by the external store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Anchor(String);

impl Anchor {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of an anchored incremental fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchoredChanges<M> {
    /// Records added or modified since the anchor.
    pub added: Vec<ExternalRecord<M>>,
    /// Records deleted since the anchor.
    pub deleted: Vec<ExternalRecordId>,
    /// Anchor to persist for the next fetch.
    pub new_anchor: Anchor,
}

impl<M> AnchoredChanges<M> {
    /// Whether the fetch carried no changes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}
