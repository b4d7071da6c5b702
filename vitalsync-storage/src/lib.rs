//! Device-local persistence for vitalsync.
//!
//! Everything the engine keeps on the device lives in one SQLite key-value
//! table, with JSON values under domain-namespaced keys:
//!
//! | key                    | value                         |
//! |------------------------|-------------------------------|
//! | `{domain}.entries`     | array of health entries       |
//! | `{domain}.preference`  | the domain's sync preference  |
//! | `{domain}.anchor`      | the domain's fetch anchor     |
//!
//! # Components
//!
//! - [`KvStore`]: the shared key-value table
//! - [`EntryStore`]: ordered entries of one domain (the Local Entry Store)
//! - [`PreferenceGate`]: per-domain sync preferences
//! - [`AnchorStore`]: per-domain incremental fetch anchors

mod anchors;
mod entry_store;
mod error;
mod kv;
mod preferences;

pub use anchors::AnchorStore;
pub use entry_store::EntryStore;
pub use error::{StorageError, StorageResult};
pub use kv::KvStore;
pub use preferences::{PreferenceGate, SyncPreference};

use vitalsync_types::Domain;

/// Builds the storage key for a domain-scoped value.
#[must_use]
pub fn domain_key(domain: Domain, name: &str) -> String {
    format!("{}.{name}", domain.as_str())
}
