//! The matching rule and merge planning.
//!
//! A local entry and an external record describe the same real-world event
//! when their timestamps differ by less than the tolerance window and their
//! values by less than the value tolerance. Planning is pure: it reads the
//! current entries and the fetched records and returns what to insert and
//! what to remove. The reconciler applies the plan on the main context.

use std::collections::HashSet;
use tracing::{debug, warn};
use vitalsync_types::{
    EntryId, ExternalRecord, ExternalRecordId, HealthEntry, Measurement, Tolerance,
};

/// Whether `entry` and `record` are the same event under `tolerance`.
pub fn is_match<M: Measurement>(
    tolerance: &Tolerance,
    entry: &HealthEntry<M>,
    record: &ExternalRecord<M>,
) -> bool {
    time_gap_ms(entry, record) < tolerance.time_window().num_milliseconds()
        && entry.value.value_delta(&record.value) < tolerance.value
}

fn time_gap_ms<M>(entry: &HealthEntry<M>, record: &ExternalRecord<M>) -> i64 {
    (entry.timestamp - record.timestamp).num_milliseconds().abs()
}

/// The local entry chosen for an external record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Index into the entries slice.
    pub index: usize,
    /// How many unclaimed entries matched.
    pub candidates: usize,
}

impl Match {
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

/// Finds the unclaimed entry matching `record`, preferring the closest
/// timestamp when several match.
pub fn find_match<M: Measurement>(
    entries: &[HealthEntry<M>],
    record: &ExternalRecord<M>,
    tolerance: &Tolerance,
    claimed: &HashSet<EntryId>,
) -> Option<Match> {
    let mut best: Option<(usize, i64)> = None;
    let mut candidates = 0;
    for (index, entry) in entries.iter().enumerate() {
        if claimed.contains(&entry.id) || !is_match(tolerance, entry, record) {
            continue;
        }
        candidates += 1;
        let gap = time_gap_ms(entry, record);
        if best.is_none_or(|(_, best_gap)| gap < best_gap) {
            best = Some((index, gap));
        }
    }
    best.map(|(index, _)| Match { index, candidates })
}

/// Changes a pass will apply to the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan<M> {
    pub additions: Vec<HealthEntry<M>>,
    pub removals: Vec<EntryId>,
    pub ambiguous: usize,
}

impl<M> MergePlan<M> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

struct Merge<M> {
    additions: Vec<HealthEntry<M>>,
    claimed: HashSet<EntryId>,
    /// External-synced entries a differently identified record matched by
    /// tolerance. Only filled when the caller asks for rebinding.
    rebound: Vec<EntryId>,
    ambiguous: usize,
}

/// Correlates fetched records with existing entries.
///
/// Identity wins first: a record whose id is already a local identity is
/// present. The remaining records are matched by tolerance against entries
/// that existed before the pass and are not in `excluded`; each entry
/// absorbs at most one record, so distinct records close in time all
/// survive.
///
/// With `rebind` set, an external-synced entry absorbed by a record with a
/// different id is reported in `rebound` and the record is added under its
/// own identity, so the local copy follows the record that now exists.
fn merge_records<M: Measurement>(
    entries: &[HealthEntry<M>],
    records: Vec<ExternalRecord<M>>,
    tolerance: &Tolerance,
    excluded: &HashSet<EntryId>,
    rebind: bool,
) -> Merge<M> {
    let local_ids: HashSet<&EntryId> = entries.iter().map(|e| &e.id).collect();
    let mut seen = HashSet::new();
    let mut claimed = HashSet::new();
    let mut pending = Vec::new();

    for record in records {
        if !seen.insert(record.id.clone()) {
            continue;
        }
        let identity = EntryId::from(&record.id);
        if local_ids.contains(&identity) {
            claimed.insert(identity);
        } else {
            pending.push(record);
        }
    }

    let mut unavailable: HashSet<EntryId> = claimed.union(excluded).cloned().collect();
    let mut additions = Vec::new();
    let mut rebound = Vec::new();
    let mut ambiguous = 0;
    for record in pending {
        let Some(m) = find_match(entries, &record, tolerance, &unavailable) else {
            additions.push(HealthEntry::from_external(record));
            continue;
        };
        let entry = &entries[m.index];
        if m.is_ambiguous() {
            ambiguous += 1;
            warn!(
                domain = %M::DOMAIN,
                record = %record.id,
                candidates = m.candidates,
                chosen = %entry.id,
                "external record matches several local entries, keeping the closest"
            );
        }
        unavailable.insert(entry.id.clone());
        claimed.insert(entry.id.clone());
        if rebind && entry.is_reconcilable() {
            debug!(
                domain = %M::DOMAIN,
                entry = %entry.id,
                record = %record.id,
                "external record replaced, following its new identity"
            );
            rebound.push(entry.id.clone());
            additions.push(HealthEntry::from_external(record));
        }
    }

    Merge {
        additions,
        claimed,
        rebound,
        ambiguous,
    }
}

/// Plans an incremental pass: add unmatched records, then remove the
/// external-synced entries whose identity was reported deleted.
///
/// An entry being deleted in the same delta never absorbs an added record.
/// An external edit arrives as a delete plus an add, and the edited record
/// must land locally rather than vanish into the entry it replaces.
pub fn plan_incremental<M: Measurement>(
    entries: &[HealthEntry<M>],
    added: Vec<ExternalRecord<M>>,
    deleted: &[ExternalRecordId],
    tolerance: &Tolerance,
) -> MergePlan<M> {
    let deleted_ids: HashSet<EntryId> = deleted.iter().map(EntryId::from).collect();
    let removed: HashSet<EntryId> = entries
        .iter()
        .filter(|e| e.is_reconcilable() && deleted_ids.contains(&e.id))
        .map(|e| e.id.clone())
        .collect();
    let merge = merge_records(entries, added, tolerance, &removed, false);
    let additions = merge
        .additions
        .into_iter()
        .filter(|e| !deleted_ids.contains(&e.id))
        .collect();
    let removals = entries
        .iter()
        .filter(|e| removed.contains(&e.id))
        .map(|e| e.id.clone())
        .collect();
    MergePlan {
        additions,
        removals,
        ambiguous: merge.ambiguous,
    }
}

/// Plans a historical import: add every unmatched record, remove nothing.
pub fn plan_historical<M: Measurement>(
    entries: &[HealthEntry<M>],
    records: Vec<ExternalRecord<M>>,
    tolerance: &Tolerance,
) -> MergePlan<M> {
    let merge = merge_records(entries, records, tolerance, &HashSet::new(), false);
    MergePlan {
        additions: merge.additions,
        removals: Vec::new(),
        ambiguous: merge.ambiguous,
    }
}

/// Plans a full reconciliation against the complete external state: add
/// unmatched records and remove every external-synced entry that no record
/// accounts for. Manual and other-integration entries are never removed.
///
/// An external-synced entry whose own record is gone but which a nearby
/// record matches by tolerance is replaced by a copy of that record, so a
/// later delete of the entry reaches the record that exists.
pub fn plan_full_reconcile<M: Measurement>(
    entries: &[HealthEntry<M>],
    records: Vec<ExternalRecord<M>>,
    tolerance: &Tolerance,
) -> MergePlan<M> {
    let merge = merge_records(entries, records, tolerance, &HashSet::new(), true);
    let rebound: HashSet<&EntryId> = merge.rebound.iter().collect();
    let removals = entries
        .iter()
        .filter(|e| {
            e.is_reconcilable() && (!merge.claimed.contains(&e.id) || rebound.contains(&e.id))
        })
        .map(|e| e.id.clone())
        .collect();
    MergePlan {
        additions: merge.additions,
        removals,
        ambiguous: merge.ambiguous,
    }
}
