//! Identifier types for health entries.
//!
//! Local entries get a UUID v7 string; entries that came from the external
//! health store keep the external record identifier as their identity, so
//! both kinds share one string-backed id type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a local health entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Creates a new locally generated id (UUID v7, time ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Parses an id from a string. Empty and whitespace-only ids are rejected.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidId("empty entry id".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntryId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<ExternalRecordId> for EntryId {
    fn from(id: ExternalRecordId) -> Self {
        Self(id.0)
    }
}

impl From<&ExternalRecordId> for EntryId {
    fn from(id: &ExternalRecordId) -> Self {
        Self(id.0.clone())
    }
}

/// Identifier the external health store assigned to one of its records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalRecordId(String);

impl ExternalRecordId {
    /// Wraps an identifier handed out by the external store.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this record id is the identity of the given entry id.
    #[must_use]
    pub fn is_identity_of(&self, entry_id: &EntryId) -> bool {
        self.0 == entry_id.0
    }
}

impl fmt::Display for ExternalRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&EntryId> for ExternalRecordId {
    fn from(id: &EntryId) -> Self {
        Self(id.0.clone())
    }
}
