//! Composition root: one main context, one store, one reconciler per domain.

use crate::adapter::HealthStoreAdapter;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::local::LocalState;
use crate::main_context::{MainBound, MainContext};
use crate::notifier::{ChangeListener, ChangeNotifier};
use crate::reconciler::Reconciler;
use crate::state::{ReconcileReport, SyncStatus};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use vitalsync_storage::{KvStore, SyncPreference};
use vitalsync_types::{Domain, HydrationValue, SleepValue, WeightValue};

/// Health sync for weight, sleep and hydration against one adapter.
pub struct HealthSync<A> {
    config: SyncConfig,
    local: MainBound<LocalState>,
    notifier: ChangeNotifier,
    weight: Arc<Reconciler<WeightValue, A>>,
    sleep: Arc<Reconciler<SleepValue, A>>,
    hydration: Arc<Reconciler<HydrationValue, A>>,
}

impl<A> HealthSync<A>
where
    A: HealthStoreAdapter<WeightValue>
        + HealthStoreAdapter<SleepValue>
        + HealthStoreAdapter<HydrationValue>
        + 'static,
{
    /// Opens (or creates) the store at `path`.
    pub fn open(path: impl AsRef<Path>, adapter: Arc<A>, config: SyncConfig) -> SyncResult<Self> {
        Self::with_store(KvStore::open(path)?, adapter, config)
    }

    pub fn open_in_memory(adapter: Arc<A>, config: SyncConfig) -> SyncResult<Self> {
        Self::with_store(KvStore::open_in_memory()?, adapter, config)
    }

    /// Loads persisted state from `kv` and hands it to a new main context.
    pub fn with_store(kv: KvStore, adapter: Arc<A>, config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let state = LocalState::load(kv)?;
        let main = MainContext::spawn(&config.main_thread_name)?;
        let local = MainBound::new(main, state);
        let notifier = ChangeNotifier::new();

        let weight: Arc<Reconciler<WeightValue, A>> = Arc::new(Reconciler::new(
            Arc::clone(&adapter),
            local.clone(),
            notifier.clone(),
            &config,
        )?);
        let sleep: Arc<Reconciler<SleepValue, A>> = Arc::new(Reconciler::new(
            Arc::clone(&adapter),
            local.clone(),
            notifier.clone(),
            &config,
        )?);
        let hydration: Arc<Reconciler<HydrationValue, A>> =
            Arc::new(Reconciler::new(adapter, local.clone(), notifier.clone(), &config)?);

        info!(thread = %config.main_thread_name, "health sync opened");
        Ok(Self {
            config,
            local,
            notifier,
            weight,
            sleep,
            hydration,
        })
    }

    /// Registers the external-change observer of every domain. Must be
    /// called inside a tokio runtime.
    pub fn start(&self) -> SyncResult<()> {
        self.weight.start_observing()?;
        self.sleep.start_observing()?;
        self.hydration.start_observing()?;
        Ok(())
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn weight(&self) -> &Arc<Reconciler<WeightValue, A>> {
        &self.weight
    }

    pub fn sleep(&self) -> &Arc<Reconciler<SleepValue, A>> {
        &self.sleep
    }

    pub fn hydration(&self) -> &Arc<Reconciler<HydrationValue, A>> {
        &self.hydration
    }

    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) {
        self.notifier.subscribe(listener);
    }

    /// Persists the user's sync toggle for `domain`. Takes effect on the
    /// next trigger.
    pub async fn set_sync_enabled(&self, domain: Domain, enabled: bool) -> SyncResult<()> {
        self.local
            .update(move |local| local.preferences.set_enabled(domain, enabled))
            .await??;
        info!(%domain, enabled, "sync preference changed");
        Ok(())
    }

    pub async fn preference(&self, domain: Domain) -> SyncResult<SyncPreference> {
        self.local
            .read(move |local| local.preferences.preference(domain))
            .await
    }

    pub async fn status(&self, domain: Domain) -> SyncResult<SyncStatus> {
        match domain {
            Domain::Weight => self.weight.status().await,
            Domain::Sleep => self.sleep.status().await,
            Domain::Hydration => self.hydration.status().await,
        }
    }

    /// Runs an incremental pass on every domain concurrently.
    pub async fn sync_all(&self) -> Vec<(Domain, SyncResult<ReconcileReport>)> {
        let (weight, sleep, hydration) = tokio::join!(
            self.weight.sync_incremental(),
            self.sleep.sync_incremental(),
            self.hydration.sync_incremental(),
        );
        vec![
            (Domain::Weight, weight),
            (Domain::Sleep, sleep),
            (Domain::Hydration, hydration),
        ]
    }

    /// "Sync Now" for one domain.
    pub async fn sync_now(&self, domain: Domain) -> SyncResult<ReconcileReport> {
        match domain {
            Domain::Weight => self.weight.sync_now().await,
            Domain::Sleep => self.sleep.sync_now().await,
            Domain::Hydration => self.hydration.sync_now().await,
        }
    }
}
