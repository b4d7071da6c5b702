//! The Change Notifier.
//!
//! Listeners learn that a domain changed and re-read the store; no diff is
//! delivered. Notifications are only ever fired from inside a main-context
//! job.

use crate::main_context::MainContext;
use crate::state::SyncStatus;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::error;
use vitalsync_types::Domain;

/// Receives change notifications on the main context.
pub trait ChangeListener: Send + Sync {
    /// The entries of `domain` changed.
    fn entries_changed(&self, domain: Domain);

    /// The sync status of `domain` changed.
    fn status_changed(&self, domain: Domain, status: &SyncStatus) {
        let _ = (domain, status);
    }
}

/// Fan-out of change notifications to subscribed listeners.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    listeners: Arc<RwLock<Vec<Arc<dyn ChangeListener>>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn entries_changed(&self, domain: Domain) {
        if !Self::on_main("entries_changed", domain) {
            return;
        }
        for listener in self.snapshot() {
            listener.entries_changed(domain);
        }
    }

    pub(crate) fn status_changed(&self, domain: Domain, status: &SyncStatus) {
        if !Self::on_main("status_changed", domain) {
            return;
        }
        for listener in self.snapshot() {
            listener.status_changed(domain, status);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn ChangeListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn on_main(kind: &str, domain: Domain) -> bool {
        let current = MainContext::is_current();
        if !current {
            error!(%domain, "dropped {kind} notification fired off the main context");
        }
        debug_assert!(current, "{kind} notification fired off the main context");
        current
    }
}
