//! Main-context state: every domain's entries and status, plus the shared
//! preference gate and anchor store.

use crate::state::SyncStatus;
use vitalsync_storage::{AnchorStore, EntryStore, KvStore, PreferenceGate, StorageResult};
use vitalsync_types::{HydrationValue, Measurement, SleepValue, WeightValue};

/// Entries and status of one domain.
#[derive(Debug)]
pub struct DomainState<M> {
    pub entries: EntryStore<M>,
    pub status: SyncStatus,
}

impl<M: Measurement> DomainState<M> {
    fn load(kv: KvStore) -> StorageResult<Self> {
        Ok(Self {
            entries: EntryStore::load(kv)?,
            status: SyncStatus::Stale,
        })
    }
}

/// Everything the UI can observe. Only reachable through
/// [`MainBound`](crate::MainBound).
#[derive(Debug)]
pub struct LocalState {
    pub weight: DomainState<WeightValue>,
    pub sleep: DomainState<SleepValue>,
    pub hydration: DomainState<HydrationValue>,
    pub preferences: PreferenceGate,
    pub anchors: AnchorStore,
}

impl LocalState {
    /// Loads all persisted state from `kv`.
    pub fn load(kv: KvStore) -> StorageResult<Self> {
        Ok(Self {
            weight: DomainState::load(kv.clone())?,
            sleep: DomainState::load(kv.clone())?,
            hydration: DomainState::load(kv.clone())?,
            preferences: PreferenceGate::load(kv.clone())?,
            anchors: AnchorStore::load(kv)?,
        })
    }
}

/// A measurement with a slot in [`LocalState`].
pub trait Tracked: Measurement {
    fn slot(local: &LocalState) -> &DomainState<Self>;
    fn slot_mut(local: &mut LocalState) -> &mut DomainState<Self>;
}

impl Tracked for WeightValue {
    fn slot(local: &LocalState) -> &DomainState<Self> {
        &local.weight
    }

    fn slot_mut(local: &mut LocalState) -> &mut DomainState<Self> {
        &mut local.weight
    }
}

impl Tracked for SleepValue {
    fn slot(local: &LocalState) -> &DomainState<Self> {
        &local.sleep
    }

    fn slot_mut(local: &mut LocalState) -> &mut DomainState<Self> {
        &mut local.sleep
    }
}

impl Tracked for HydrationValue {
    fn slot(local: &LocalState) -> &DomainState<Self> {
        &local.hydration
    }

    fn slot_mut(local: &mut LocalState) -> &mut DomainState<Self> {
        &mut local.hydration
    }
}
