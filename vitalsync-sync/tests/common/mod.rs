//! Shared helpers for the sync integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use vitalsync_sync::{
    ChangeListener, HealthSync, MainContext, MockHealthStore, Reconciler, SyncConfig, SyncStatus,
    Tracked,
};
use vitalsync_types::Domain;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    base() + Duration::seconds(secs)
}

pub fn open() -> (Arc<MockHealthStore>, HealthSync<MockHealthStore>) {
    init_tracing();
    let mock = Arc::new(MockHealthStore::new());
    let sync = HealthSync::open_in_memory(Arc::clone(&mock), SyncConfig::default()).unwrap();
    (mock, sync)
}

/// Opens a sync with every domain enabled.
pub async fn open_enabled() -> (Arc<MockHealthStore>, HealthSync<MockHealthStore>) {
    let (mock, sync) = open();
    for domain in Domain::ALL {
        sync.set_sync_enabled(domain, true).await.unwrap();
    }
    (mock, sync)
}

/// Waits until `reconciler` holds `count` entries, yielding to spawned
/// observer passes in between.
pub async fn wait_for_entries<M: Tracked>(
    reconciler: &Reconciler<M, MockHealthStore>,
    count: usize,
) -> bool {
    for _ in 0..500 {
        if reconciler.entries().await.unwrap().len() == count {
            return true;
        }
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    false
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Entries(Domain),
    Status(Domain, SyncStatus),
}

/// Records every notification and whether it arrived on the main context.
#[derive(Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<(Notification, bool)>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn all_on_main(&self) -> bool {
        self.seen.lock().unwrap().iter().all(|(_, on_main)| *on_main)
    }

    pub fn entries_changed_count(&self, domain: Domain) -> usize {
        self.notifications()
            .iter()
            .filter(|n| **n == Notification::Entries(domain))
            .count()
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }

    fn record(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap()
            .push((notification, MainContext::is_current()));
    }
}

impl ChangeListener for RecordingListener {
    fn entries_changed(&self, domain: Domain) {
        self.record(Notification::Entries(domain));
    }

    fn status_changed(&self, domain: Domain, status: &SyncStatus) {
        self.record(Notification::Status(domain, status.clone()));
    }
}
