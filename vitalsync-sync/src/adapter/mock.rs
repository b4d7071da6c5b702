//! In-memory health store for testing.
//!
//! Behaves like the platform store as far as the reconciler can tell:
//! anchors are change-sequence numbers, deletions leave tombstones that
//! anchored fetches report, permissions are per domain, and every mutation
//! fires the domain's observers, whoever made it. Values are kept as JSON
//! so one store serves every measurement type.

use super::{AdapterError, AdapterResult, ChangeCallback, HealthStoreAdapter};
use crate::main_context::MainContext;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use vitalsync_types::{
    Anchor, AnchoredChanges, Domain, ExternalRecord, ExternalRecordId, HealthEntry, Measurement,
};

/// Per-domain call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub incremental: usize,
    pub historical: usize,
    pub writes: usize,
    pub deletes: usize,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    seq: u64,
    timestamp: DateTime<Utc>,
    value: serde_json::Value,
    source: Option<String>,
}

#[derive(Default)]
struct DomainLog {
    authorized: bool,
    records: BTreeMap<String, StoredRecord>,
    tombstones: Vec<(u64, ExternalRecordId)>,
    observers: Vec<ChangeCallback>,
    fail_next_fetch: Option<AdapterError>,
    calls: MockCalls,
}

struct MockInner {
    available: bool,
    seq: u64,
    next_id: u64,
    domains: HashMap<Domain, DomainLog>,
}

/// A mock external health store.
pub struct MockHealthStore {
    inner: Mutex<MockInner>,
    calls_on_main: AtomicUsize,
}

impl Default for MockHealthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHealthStore {
    /// Creates an available store with every domain authorized.
    pub fn new() -> Self {
        let domains = Domain::ALL
            .into_iter()
            .map(|d| {
                (
                    d,
                    DomainLog {
                        authorized: true,
                        ..Default::default()
                    },
                )
            })
            .collect();
        Self {
            inner: Mutex::new(MockInner {
                available: true,
                seq: 0,
                next_id: 0,
                domains,
            }),
            calls_on_main: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Test controls ────────────────────────────────────────────

    pub fn set_authorized(&self, domain: Domain, authorized: bool) {
        self.lock().log_mut(domain).authorized = authorized;
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Makes the next incremental or historical fetch of `domain` fail.
    pub fn fail_next_fetch(&self, domain: Domain, error: AdapterError) {
        self.lock().log_mut(domain).fail_next_fetch = Some(error);
    }

    /// Adds a record as if another app wrote it. Fires observers.
    pub fn insert_external<M: Measurement>(
        &self,
        timestamp: DateTime<Utc>,
        value: M,
    ) -> ExternalRecordId {
        let id = self.lock().next_record_id();
        self.insert_external_with_id(id.clone(), timestamp, value);
        id
    }

    /// Adds (or overwrites) a record with a chosen id. Fires observers.
    pub fn insert_external_with_id<M: Measurement>(
        &self,
        id: ExternalRecordId,
        timestamp: DateTime<Utc>,
        value: M,
    ) {
        let json = serde_json::to_value(&value).unwrap_or(serde_json::Value::Null);
        self.insert_raw(M::DOMAIN, id, timestamp, json);
    }

    /// Adds a record with an arbitrary JSON payload. Fires observers.
    pub fn insert_raw(
        &self,
        domain: Domain,
        id: ExternalRecordId,
        timestamp: DateTime<Utc>,
        value: serde_json::Value,
    ) {
        let observers = {
            let mut inner = self.lock();
            let seq = inner.bump();
            let log = inner.log_mut(domain);
            log.records.insert(
                id.as_str().to_string(),
                StoredRecord {
                    seq,
                    timestamp,
                    value,
                    source: Some("com.example.other".to_string()),
                },
            );
            log.observers.clone()
        };
        fire(&observers);
    }

    /// Removes a record as if another app deleted it. Fires observers.
    pub fn remove_external(&self, domain: Domain, id: &ExternalRecordId) -> bool {
        let (removed, observers) = {
            let mut inner = self.lock();
            let removed = inner.remove(domain, id);
            (removed, inner.log_mut(domain).observers.clone())
        };
        if removed {
            fire(&observers);
        }
        removed
    }

    /// Decoded records of one domain, oldest first.
    pub fn records<M: Measurement>(&self) -> Vec<ExternalRecord<M>> {
        let inner = self.lock();
        let mut records: Vec<ExternalRecord<M>> = inner
            .log(M::DOMAIN)
            .map(|log| {
                log.records
                    .iter()
                    .filter_map(|(id, r)| decode(id, r).ok())
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by_key(|r| r.timestamp);
        records
    }

    pub fn record_count(&self, domain: Domain) -> usize {
        self.lock().log(domain).map_or(0, |log| log.records.len())
    }

    pub fn observer_count(&self, domain: Domain) -> usize {
        self.lock().log(domain).map_or(0, |log| log.observers.len())
    }

    pub fn calls(&self, domain: Domain) -> MockCalls {
        self.lock().log(domain).map(|log| log.calls).unwrap_or_default()
    }

    /// Number of adapter calls that were made from the main context.
    pub fn calls_on_main(&self) -> usize {
        self.calls_on_main.load(Ordering::SeqCst)
    }

    fn enter(&self, domain: Domain) -> AdapterResult<()> {
        if MainContext::is_current() {
            self.calls_on_main.fetch_add(1, Ordering::SeqCst);
        }
        let mut inner = self.lock();
        if !inner.available {
            return Err(AdapterError::Unavailable(
                "health data is not available on this device".into(),
            ));
        }
        if !inner.log_mut(domain).authorized {
            return Err(AdapterError::NotAuthorized);
        }
        Ok(())
    }

    fn take_fetch_failure(&self, domain: Domain) -> AdapterResult<()> {
        match self.lock().log_mut(domain).fail_next_fetch.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl MockInner {
    fn log(&self, domain: Domain) -> Option<&DomainLog> {
        self.domains.get(&domain)
    }

    fn log_mut(&mut self, domain: Domain) -> &mut DomainLog {
        self.domains.entry(domain).or_default()
    }

    fn bump(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn next_record_id(&mut self) -> ExternalRecordId {
        self.next_id += 1;
        ExternalRecordId::new(format!("mock-{}", self.next_id))
    }

    fn remove(&mut self, domain: Domain, id: &ExternalRecordId) -> bool {
        let seq = self.seq + 1;
        let log = self.log_mut(domain);
        if log.records.remove(id.as_str()).is_none() {
            return false;
        }
        log.tombstones.push((seq, id.clone()));
        self.seq = seq;
        true
    }
}

fn decode<M: Measurement>(id: &str, record: &StoredRecord) -> AdapterResult<ExternalRecord<M>> {
    let value: M =
        serde_json::from_value(record.value.clone()).map_err(|e| AdapterError::InvalidRecord {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
    let mut out = ExternalRecord::new(ExternalRecordId::new(id), record.timestamp, value);
    out.source = record.source.clone();
    Ok(out)
}

fn fire(observers: &[ChangeCallback]) {
    for observer in observers {
        observer();
    }
}

fn parse_anchor(anchor: Option<&Anchor>) -> AdapterResult<u64> {
    match anchor {
        None => Ok(0),
        Some(a) => a
            .as_str()
            .parse()
            .map_err(|_| AdapterError::Io(format!("unrecognised anchor {:?}", a.as_str()))),
    }
}

#[async_trait]
impl<M: Measurement> HealthStoreAdapter<M> for MockHealthStore {
    async fn is_authorized(&self) -> bool {
        let inner = self.lock();
        inner.available && inner.log(M::DOMAIN).is_some_and(|log| log.authorized)
    }

    async fn fetch_incremental(
        &self,
        anchor: Option<&Anchor>,
    ) -> AdapterResult<AnchoredChanges<M>> {
        tokio::task::yield_now().await;
        self.enter(M::DOMAIN)?;
        self.lock().log_mut(M::DOMAIN).calls.incremental += 1;
        self.take_fetch_failure(M::DOMAIN)?;
        let since = parse_anchor(anchor)?;

        let inner = self.lock();
        let Some(log) = inner.log(M::DOMAIN) else {
            return Ok(AnchoredChanges {
                added: Vec::new(),
                deleted: Vec::new(),
                new_anchor: Anchor::new(inner.seq.to_string()),
            });
        };
        let added = log
            .records
            .iter()
            .filter(|(_, r)| r.seq > since)
            .map(|(id, r)| decode(id, r))
            .collect::<AdapterResult<Vec<_>>>()?;
        let deleted = if anchor.is_some() {
            log.tombstones
                .iter()
                .filter(|(seq, _)| *seq > since)
                .map(|(_, id)| id.clone())
                .collect()
        } else {
            Vec::new()
        };
        Ok(AnchoredChanges {
            added,
            deleted,
            new_anchor: Anchor::new(inner.seq.to_string()),
        })
    }

    async fn fetch_historical(
        &self,
        since: DateTime<Utc>,
    ) -> AdapterResult<Vec<ExternalRecord<M>>> {
        tokio::task::yield_now().await;
        self.enter(M::DOMAIN)?;
        self.lock().log_mut(M::DOMAIN).calls.historical += 1;
        self.take_fetch_failure(M::DOMAIN)?;

        let inner = self.lock();
        let mut records = match inner.log(M::DOMAIN) {
            Some(log) => log
                .records
                .iter()
                .filter(|(_, r)| r.timestamp >= since)
                .map(|(id, r)| decode(id, r))
                .collect::<AdapterResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        records.sort_by_key(|r: &ExternalRecord<M>| r.timestamp);
        Ok(records)
    }

    async fn write(&self, entry: &HealthEntry<M>) -> AdapterResult<ExternalRecordId> {
        tokio::task::yield_now().await;
        self.enter(M::DOMAIN)?;
        let value = serde_json::to_value(&entry.value).map_err(|e| AdapterError::InvalidRecord {
            id: entry.id.to_string(),
            reason: e.to_string(),
        })?;
        let (id, observers) = {
            let mut inner = self.lock();
            let id = inner.next_record_id();
            let seq = inner.bump();
            let log = inner.log_mut(M::DOMAIN);
            log.calls.writes += 1;
            log.records.insert(
                id.as_str().to_string(),
                StoredRecord {
                    seq,
                    timestamp: entry.timestamp,
                    value,
                    source: Some("vitalsync".to_string()),
                },
            );
            (id, log.observers.clone())
        };
        fire(&observers);
        Ok(id)
    }

    async fn delete(&self, id: &ExternalRecordId) -> AdapterResult<()> {
        tokio::task::yield_now().await;
        self.enter(M::DOMAIN)?;
        let (removed, observers) = {
            let mut inner = self.lock();
            inner.log_mut(M::DOMAIN).calls.deletes += 1;
            let removed = inner.remove(M::DOMAIN, id);
            (removed, inner.log_mut(M::DOMAIN).observers.clone())
        };
        if removed {
            fire(&observers);
        }
        Ok(())
    }

    fn observe(&self, on_change: ChangeCallback) -> AdapterResult<()> {
        let mut inner = self.lock();
        if !inner.available {
            return Err(AdapterError::Unavailable(
                "health data is not available on this device".into(),
            ));
        }
        inner.log_mut(M::DOMAIN).observers.push(on_change);
        Ok(())
    }
}
