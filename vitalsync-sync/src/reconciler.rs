//! The Sync Reconciler.
//!
//! One reconciler per domain, generic over the measurement type and the
//! adapter. Every pass follows the same shape: gate, fetch off the main
//! context, validate the whole batch, then apply the plan in a single
//! main-context job (additions, deletions, anchor, notification). A failed
//! fetch or a rejected batch leaves entries and anchor as they were.

use crate::adapter::{AdapterError, ChangeCallback, HealthStoreAdapter};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::local::{LocalState, Tracked};
use crate::main_context::MainBound;
use crate::matching::{MergePlan, plan_full_reconcile, plan_historical, plan_incremental};
use crate::notifier::ChangeNotifier;
use crate::state::{ReconcileReport, SkipReason, SyncMode, SyncStatus};
use crate::suppression::ObserverSuppression;
use chrono::{DateTime, TimeDelta, Utc};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use vitalsync_types::{
    Anchor, EntryId, ExternalRecord, ExternalRecordId, HealthEntry, MatchTolerances, Measurement,
};

/// Reconciles one domain's local entries with the external health store.
pub struct Reconciler<M, A> {
    adapter: Arc<A>,
    local: MainBound<LocalState>,
    notifier: ChangeNotifier,
    tolerances: MatchTolerances,
    horizon: TimeDelta,
    settle: Duration,
    suppression: ObserverSuppression,
    observing: AtomicBool,
    _measurement: PhantomData<fn() -> M>,
}

impl<M, A> Reconciler<M, A>
where
    M: Tracked,
    A: HealthStoreAdapter<M> + 'static,
{
    pub fn new(
        adapter: Arc<A>,
        local: MainBound<LocalState>,
        notifier: ChangeNotifier,
        config: &SyncConfig,
    ) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            adapter,
            local,
            notifier,
            tolerances: config.tolerances.for_domain(M::DOMAIN),
            horizon: config.historical_horizon()?,
            settle: config.observer_settle(),
            suppression: ObserverSuppression::new(),
            observing: AtomicBool::new(false),
            _measurement: PhantomData,
        })
    }

    pub fn domain(&self) -> vitalsync_types::Domain {
        M::DOMAIN
    }

    pub fn tolerances(&self) -> MatchTolerances {
        self.tolerances
    }

    pub fn suppression(&self) -> &ObserverSuppression {
        &self.suppression
    }

    pub fn is_observing(&self) -> bool {
        self.observing.load(Ordering::SeqCst)
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Current entries, newest first.
    pub async fn entries(&self) -> SyncResult<Vec<HealthEntry<M>>> {
        self.local
            .read(|local| M::slot(local).entries.all().to_vec())
            .await
    }

    pub async fn status(&self) -> SyncResult<SyncStatus> {
        self.local
            .read(|local| M::slot(local).status.clone())
            .await
    }

    pub async fn anchor(&self) -> SyncResult<Option<Anchor>> {
        self.local
            .read(|local| local.anchors.get(M::DOMAIN).cloned())
            .await
    }

    // ── Reconciliation passes ────────────────────────────────────

    /// Mode A: applies the delta since the stored anchor.
    pub async fn sync_incremental(&self) -> SyncResult<ReconcileReport> {
        let mode = SyncMode::Incremental;
        if let Some(reason) = self.gate().await? {
            return self.skip(mode, reason).await;
        }
        let (anchor, previous) = self.begin(mode).await?;

        let changes = match self.adapter.fetch_incremental(anchor.as_ref()).await {
            Ok(changes) => changes,
            Err(e) => return self.fail(mode, previous, Self::adapter_error(e)).await,
        };
        if let Err(e) = validate_batch(&changes.added) {
            return self.fail(mode, previous, e).await;
        }
        debug!(
            domain = %M::DOMAIN,
            added = changes.added.len(),
            deleted = changes.deleted.len(),
            "fetched incremental changes"
        );

        let tolerance = self.tolerances.strict;
        let added = changes.added;
        let deleted = changes.deleted;
        self.apply(
            mode,
            previous,
            move |entries| plan_incremental(entries, added, &deleted, &tolerance),
            Some(changes.new_anchor),
            false,
        )
        .await
    }

    /// Mode B: merges every record inside the historical horizon.
    ///
    /// Runs whether or not sync is enabled; the user asked for it.
    pub async fn import_historical(&self) -> SyncResult<ReconcileReport> {
        let mode = SyncMode::HistoricalImport;
        if !self.adapter.is_authorized().await {
            return self.skip(mode, SkipReason::NotAuthorized).await;
        }
        let (_, previous) = self.begin(mode).await?;

        let Some(since) = Utc::now().checked_sub_signed(self.horizon) else {
            let reason = "historical horizon reaches before the earliest date";
            return self
                .fail(mode, previous, SyncError::InvalidConfig(reason.into()))
                .await;
        };
        let records = match self.adapter.fetch_historical(since).await {
            Ok(records) => records,
            Err(e) => return self.fail(mode, previous, Self::adapter_error(e)).await,
        };
        if let Err(e) = validate_batch(&records) {
            return self.fail(mode, previous, e).await;
        }
        debug!(domain = %M::DOMAIN, records = records.len(), %since, "fetched history");

        let tolerance = self.tolerances.historical;
        self.apply(
            mode,
            previous,
            move |entries| plan_historical(entries, records, &tolerance),
            None,
            true,
        )
        .await
    }

    /// Mode C: compares the complete external state with the local store
    /// and removes external-synced entries that no longer exist.
    ///
    /// The fetch ignores the stored anchor. The anchor it returns replaces
    /// the stored one only if the pass succeeds.
    pub async fn sync_with_reset(&self) -> SyncResult<ReconcileReport> {
        let mode = SyncMode::ResetAndReconcile;
        if let Some(reason) = self.gate().await? {
            return self.skip(mode, reason).await;
        }
        let (_, previous) = self.begin(mode).await?;

        let changes = match self.adapter.fetch_incremental(None).await {
            Ok(changes) => changes,
            Err(e) => return self.fail(mode, previous, Self::adapter_error(e)).await,
        };
        if let Err(e) = validate_batch(&changes.added) {
            return self.fail(mode, previous, e).await;
        }

        let tolerance = self.tolerances.historical;
        let records = changes.added;
        self.apply(
            mode,
            previous,
            move |entries| plan_full_reconcile(entries, records, &tolerance),
            Some(changes.new_anchor),
            false,
        )
        .await
    }

    /// The user's "Sync Now": a historical import until one has completed,
    /// a reset-and-reconcile pass afterwards.
    pub async fn sync_now(&self) -> SyncResult<ReconcileReport> {
        let imported = self
            .local
            .read(|local| local.preferences.has_completed_initial_import(M::DOMAIN))
            .await?;
        if imported {
            self.sync_with_reset().await
        } else {
            self.import_historical().await
        }
    }

    /// Forgets the stored anchor so the next incremental pass sees the
    /// whole external store.
    pub async fn reset_anchor(&self) -> SyncResult<()> {
        self.local
            .update(|local| local.anchors.reset(M::DOMAIN))
            .await??;
        Ok(())
    }

    // ── Local write-through ──────────────────────────────────────

    /// Adds a manual entry and, when sync is on, writes it outward.
    ///
    /// A failed outbound write is logged; the local entry stands.
    pub async fn add_entry(&self, timestamp: DateTime<Utc>, value: M) -> SyncResult<HealthEntry<M>> {
        let entry = HealthEntry::manual(timestamp, value);
        entry
            .validate()
            .map_err(|e| SyncError::InvalidEntry(e.to_string()))?;
        self.store_local(entry.clone()).await?;
        info!(domain = %M::DOMAIN, id = %entry.id, "added manual entry");

        if let Some(reason) = self.gate().await? {
            debug!(domain = %M::DOMAIN, ?reason, "not writing entry outward");
            return Ok(entry);
        }
        let record = match self.adapter.write(&entry).await {
            Ok(record) => record,
            Err(e) => {
                warn!(domain = %M::DOMAIN, id = %entry.id, error = %e, "outbound write failed");
                return Ok(entry);
            }
        };

        let linked = entry.with_external_id(record.clone());
        if !self.link_local(linked.clone()).await? {
            // Deleted locally while the write was in flight.
            self.push_delete(record).await?;
        }
        Ok(linked)
    }

    /// Deletes an entry locally and, when it is linked to an external
    /// record and sync is on, outward. Returns whether it existed.
    pub async fn delete_entry(&self, id: &EntryId) -> SyncResult<bool> {
        let id = id.clone();
        let notifier = self.notifier.clone();
        let removed = self
            .local
            .update(move |local| -> SyncResult<Option<HealthEntry<M>>> {
                let slot = M::slot_mut(local);
                let Some(removed) = slot.entries.remove(&id) else {
                    return Ok(None);
                };
                if let Err(e) = slot.entries.persist() {
                    slot.entries.insert(removed);
                    return Err(e.into());
                }
                notifier.entries_changed(M::DOMAIN);
                Ok(Some(removed))
            })
            .await??;

        let Some(entry) = removed else {
            return Ok(false);
        };
        info!(domain = %M::DOMAIN, id = %entry.id, "deleted entry");
        if let Some(record) = entry.linked_record() {
            self.push_delete(record).await?;
        }
        Ok(true)
    }

    /// Edits an entry: the old one is deleted and a new manual entry
    /// inserted.
    pub async fn replace_entry(
        &self,
        id: &EntryId,
        timestamp: DateTime<Utc>,
        value: M,
    ) -> SyncResult<HealthEntry<M>> {
        value
            .validate(timestamp)
            .map_err(SyncError::InvalidEntry)?;
        if !self.delete_entry(id).await? {
            return Err(SyncError::EntryNotFound(id.to_string()));
        }
        self.add_entry(timestamp, value).await
    }

    // ── Observation ──────────────────────────────────────────────

    /// Registers the adapter observer. Each callback starts an incremental
    /// pass on the current tokio runtime unless suppressed. Registering
    /// twice is a no-op.
    pub fn start_observing(self: &Arc<Self>) -> SyncResult<()> {
        if self.observing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.observing.store(false, Ordering::SeqCst);
                return Err(SyncError::NoRuntime(e.to_string()));
            }
        };

        let weak = Arc::downgrade(self);
        let callback: ChangeCallback = Arc::new(move || {
            let Some(this) = weak.upgrade() else {
                return;
            };
            if this.suppression.is_suppressed() {
                debug!(domain = %M::DOMAIN, "observer suppressed while an outbound delete settles");
                return;
            }
            runtime.spawn(async move {
                if let Err(e) = this.sync_incremental().await {
                    warn!(domain = %M::DOMAIN, error = %e, "observer-triggered sync failed");
                }
            });
        });

        if let Err(e) = self.adapter.observe(callback) {
            self.observing.store(false, Ordering::SeqCst);
            return Err(Self::adapter_error(e));
        }
        info!(domain = %M::DOMAIN, "observing external changes");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────

    /// Preference first, then the domain's own permission.
    async fn gate(&self) -> SyncResult<Option<SkipReason>> {
        let enabled = self
            .local
            .read(|local| local.preferences.is_enabled(M::DOMAIN))
            .await?;
        if !enabled {
            return Ok(Some(SkipReason::SyncDisabled));
        }
        if !self.adapter.is_authorized().await {
            return Ok(Some(SkipReason::NotAuthorized));
        }
        Ok(None)
    }

    /// Early exits report through the main context too.
    async fn skip(&self, mode: SyncMode, reason: SkipReason) -> SyncResult<ReconcileReport> {
        self.local
            .read(move |_| {
                debug!(domain = %M::DOMAIN, ?mode, ?reason, "skipping pass");
                ReconcileReport::skipped(M::DOMAIN, mode, reason)
            })
            .await
    }

    /// Marks the domain as syncing; returns the stored anchor and the
    /// status to restore if the pass turns into a no-op.
    async fn begin(&self, mode: SyncMode) -> SyncResult<(Option<Anchor>, SyncStatus)> {
        let notifier = self.notifier.clone();
        self.local
            .update(move |local| {
                debug!(domain = %M::DOMAIN, ?mode, "starting pass");
                let anchor = local.anchors.get(M::DOMAIN).cloned();
                let slot = M::slot_mut(local);
                let previous = std::mem::replace(&mut slot.status, SyncStatus::Syncing);
                notifier.status_changed(M::DOMAIN, &slot.status);
                (anchor, previous)
            })
            .await
    }

    async fn apply<P>(
        &self,
        mode: SyncMode,
        previous: SyncStatus,
        plan: P,
        anchor: Option<Anchor>,
        mark_import: bool,
    ) -> SyncResult<ReconcileReport>
    where
        P: FnOnce(&[HealthEntry<M>]) -> MergePlan<M> + Send + 'static,
    {
        let notifier = self.notifier.clone();
        let outcome = self
            .local
            .update(move |local| apply_plan::<M, P>(local, &notifier, mode, plan, anchor, mark_import))
            .await?;
        match outcome {
            Ok(report) => {
                info!(
                    domain = %M::DOMAIN,
                    ?mode,
                    added = report.added,
                    removed = report.removed,
                    ambiguous = report.ambiguous,
                    "sync pass complete"
                );
                Ok(report)
            }
            Err(e) => self.fail(mode, previous, e).await,
        }
    }

    async fn fail(
        &self,
        mode: SyncMode,
        previous: SyncStatus,
        error: SyncError,
    ) -> SyncResult<ReconcileReport> {
        let notifier = self.notifier.clone();
        if let SyncError::NotAuthorized { .. } = error {
            info!(domain = %M::DOMAIN, ?mode, "not authorized, leaving state unchanged");
            return self
                .local
                .update(move |local| {
                    let slot = M::slot_mut(local);
                    slot.status = previous;
                    notifier.status_changed(M::DOMAIN, &slot.status);
                    ReconcileReport::skipped(M::DOMAIN, mode, SkipReason::NotAuthorized)
                })
                .await;
        }

        warn!(domain = %M::DOMAIN, ?mode, %error, "sync pass failed");
        let status = match &error {
            SyncError::AdapterUnavailable { reason, .. } => SyncStatus::Unavailable {
                reason: reason.clone(),
            },
            other => SyncStatus::Failed {
                reason: other.to_string(),
            },
        };
        self.local
            .update(move |local| {
                let slot = M::slot_mut(local);
                slot.status = status;
                notifier.status_changed(M::DOMAIN, &slot.status);
            })
            .await?;
        Err(error)
    }

    async fn store_local(&self, entry: HealthEntry<M>) -> SyncResult<()> {
        let notifier = self.notifier.clone();
        self.local
            .update(move |local| -> SyncResult<()> {
                let slot = M::slot_mut(local);
                let id = entry.id.clone();
                let replaced = slot.entries.insert(entry);
                if let Err(e) = slot.entries.persist() {
                    slot.entries.remove(&id);
                    if let Some(previous) = replaced {
                        slot.entries.insert(previous);
                    }
                    return Err(e.into());
                }
                notifier.entries_changed(M::DOMAIN);
                Ok(())
            })
            .await?
    }

    /// Replaces an entry with its linked copy. Returns false when the
    /// entry is gone.
    async fn link_local(&self, linked: HealthEntry<M>) -> SyncResult<bool> {
        let notifier = self.notifier.clone();
        self.local
            .update(move |local| -> SyncResult<bool> {
                let slot = M::slot_mut(local);
                if !slot.entries.contains(&linked.id) {
                    return Ok(false);
                }
                let id = linked.id.clone();
                let unlinked = slot.entries.insert(linked);
                if let Err(e) = slot.entries.persist() {
                    slot.entries.remove(&id);
                    if let Some(unlinked) = unlinked {
                        slot.entries.insert(unlinked);
                    }
                    return Err(e.into());
                }
                notifier.entries_changed(M::DOMAIN);
                Ok(true)
            })
            .await?
    }

    async fn push_delete(&self, record: ExternalRecordId) -> SyncResult<()> {
        if let Some(reason) = self.gate().await? {
            debug!(domain = %M::DOMAIN, %record, ?reason, "not deleting outward");
            return Ok(());
        }
        self.suppression.suppress_for(self.settle);
        if let Err(e) = self.adapter.delete(&record).await {
            warn!(domain = %M::DOMAIN, %record, error = %e, "outbound delete failed");
        }
        Ok(())
    }

    fn adapter_error(error: AdapterError) -> SyncError {
        let domain = M::DOMAIN;
        match error {
            AdapterError::NotAuthorized => SyncError::NotAuthorized { domain },
            AdapterError::Unavailable(reason) | AdapterError::Io(reason) => {
                SyncError::AdapterUnavailable { domain, reason }
            }
            AdapterError::InvalidRecord { id, reason } => SyncError::PartialBatchFailure {
                domain,
                rejected: 1,
                reason: format!("record {id}: {reason}"),
            },
        }
    }
}

/// Rejects the whole batch if any record is unusable.
fn validate_batch<M: Measurement>(records: &[ExternalRecord<M>]) -> SyncResult<()> {
    let failures: Vec<String> = records
        .iter()
        .filter_map(|r| r.validate().err().map(|e| e.to_string()))
        .collect();
    match failures.first() {
        None => Ok(()),
        Some(first) => Err(SyncError::PartialBatchFailure {
            domain: M::DOMAIN,
            rejected: failures.len(),
            reason: first.clone(),
        }),
    }
}

/// Applies a plan on the main context: additions, deletions, anchor,
/// import flag, then notifications. Any persistence failure restores the
/// entries as they were before the pass.
fn apply_plan<M, P>(
    local: &mut LocalState,
    notifier: &ChangeNotifier,
    mode: SyncMode,
    plan: P,
    anchor: Option<Anchor>,
    mark_import: bool,
) -> SyncResult<ReconcileReport>
where
    M: Tracked,
    P: FnOnce(&[HealthEntry<M>]) -> MergePlan<M>,
{
    let domain = M::DOMAIN;
    let mut report = ReconcileReport::new(domain, mode);

    let slot = M::slot_mut(local);
    let snapshot = slot.entries.snapshot();
    let plan = plan(slot.entries.all());
    report.ambiguous = plan.ambiguous;
    if plan.is_empty() {
        debug!(domain = %domain, ?mode, "local entries already up to date");
    } else {
        report.added = plan.additions.len();
        for entry in plan.additions {
            slot.entries.insert(entry);
        }
        for id in &plan.removals {
            if slot.entries.remove(id).is_some() {
                report.removed += 1;
            }
        }
    }
    let changed = report.changed();
    if changed && let Err(e) = slot.entries.persist() {
        slot.entries.restore(snapshot);
        return Err(e.into());
    }

    if let Some(anchor) = anchor
        && let Err(e) = local.anchors.save(domain, anchor)
    {
        rollback::<M>(local, snapshot, changed);
        return Err(e.into());
    }
    if mark_import && let Err(e) = local.preferences.mark_import_complete(domain) {
        rollback::<M>(local, snapshot, changed);
        return Err(e.into());
    }

    let slot = M::slot_mut(local);
    slot.status = SyncStatus::Synced { at: Utc::now() };
    if changed {
        notifier.entries_changed(domain);
    }
    notifier.status_changed(domain, &slot.status);
    Ok(report)
}

fn rollback<M: Tracked>(local: &mut LocalState, snapshot: Vec<HealthEntry<M>>, persisted: bool) {
    let slot = M::slot_mut(local);
    slot.entries.restore(snapshot);
    if persisted && let Err(e) = slot.entries.persist() {
        error!(domain = %M::DOMAIN, error = %e, "failed to restore entries after a rejected pass");
    }
}
