//! The Local Entry Store: ordered health entries of one domain.
//!
//! Entries are kept newest-first. The order is recomputed after every
//! mutation. Entries sharing a timestamp are all kept: deciding whether two
//! entries describe the same event is the reconciler's job, never the
//! store's.

use crate::domain_key;
use crate::error::StorageResult;
use crate::kv::KvStore;
use tracing::debug;
use vitalsync_types::{EntryId, HealthEntry, Measurement};

const ENTRIES_KEY: &str = "entries";

/// In-memory entries of one domain, persisted as a JSON array.
#[derive(Debug, Clone)]
pub struct EntryStore<M> {
    kv: KvStore,
    entries: Vec<HealthEntry<M>>,
}

impl<M: Measurement> EntryStore<M> {
    /// Creates an empty store without reading persisted entries.
    pub fn new(kv: KvStore) -> Self {
        Self {
            kv,
            entries: Vec::new(),
        }
    }

    /// Opens the store and loads the persisted entries.
    pub fn load(kv: KvStore) -> StorageResult<Self> {
        let entries: Vec<HealthEntry<M>> = kv.get_json(&Self::key())?.unwrap_or_default();
        debug!("Loaded {} {} entries", entries.len(), M::DOMAIN);
        let mut store = Self::new(kv);
        store.entries = entries;
        store.sort();
        Ok(store)
    }

    /// Writes the current entries to device storage.
    pub fn persist(&self) -> StorageResult<()> {
        self.kv.put_json(&Self::key(), &self.entries)?;
        debug!("Persisted {} {} entries", self.entries.len(), M::DOMAIN);
        Ok(())
    }

    /// Inserts an entry. An entry with the same identity is replaced and
    /// returned; entries that merely share a timestamp or value are kept.
    pub fn insert(&mut self, entry: HealthEntry<M>) -> Option<HealthEntry<M>> {
        let previous = self.take(&entry.id);
        self.entries.push(entry);
        self.sort();
        previous
    }

    /// Removes the entry with the given identity.
    pub fn remove(&mut self, id: &EntryId) -> Option<HealthEntry<M>> {
        let removed = self.take(id);
        if removed.is_some() {
            self.sort();
        }
        removed
    }

    /// All entries, newest first.
    pub fn all(&self) -> &[HealthEntry<M>] {
        &self.entries
    }

    pub fn get(&self, id: &EntryId) -> Option<&HealthEntry<M>> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the current entries so a failed batch can be rolled back.
    pub fn snapshot(&self) -> Vec<HealthEntry<M>> {
        self.entries.clone()
    }

    /// Restores entries captured by [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, entries: Vec<HealthEntry<M>>) {
        self.entries = entries;
        self.sort();
    }

    fn take(&mut self, id: &EntryId) -> Option<HealthEntry<M>> {
        let idx = self.entries.iter().position(|e| &e.id == id)?;
        Some(self.entries.remove(idx))
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    fn key() -> String {
        domain_key(M::DOMAIN, ENTRIES_KEY)
    }
}
