//! Core type definitions for vitalsync.
//!
//! This crate defines the fundamental types shared by the storage layer and
//! the sync engine:
//! - Entry and external record identifiers
//! - Tracked domains (weight, sleep, hydration)
//! - Measurement values and their matching tolerances
//! - Health entries, external records and anchors
//!
//! Nothing here performs I/O.

mod domain;
mod entry;
mod ids;
mod measurement;

pub use domain::Domain;
pub use entry::{
    Anchor, AnchoredChanges, ExternalRecord, HealthEntry, HydrationEntry, Provenance, SleepEntry,
    WeightEntry,
};
pub use ids::{EntryId, ExternalRecordId};
pub use measurement::{
    HydrationValue, LiquidType, MatchTolerances, Measurement, SleepValue, Tolerance, WeightUnit,
    WeightValue,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}
