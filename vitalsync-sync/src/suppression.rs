//! Observer re-entrancy guard.
//!
//! An outbound delete makes the external store fire the domain's observer.
//! While the store settles, that callback is ignored so it does not start a
//! fetch racing the operation that caused it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Suppression window for one domain's observer. Clones share the window.
#[derive(Debug, Clone, Default)]
pub struct ObserverSuppression {
    until: Arc<Mutex<Option<Instant>>>,
}

impl ObserverSuppression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppresses the observer for `window` from now. A later call extends
    /// the window; it never shortens it.
    pub fn suppress_for(&self, window: Duration) {
        let deadline = Instant::now() + window;
        let mut until = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        if (*until).is_none_or(|current| current < deadline) {
            *until = Some(deadline);
        }
    }

    /// Whether observer callbacks are currently ignored. Clears itself once
    /// the window has passed.
    pub fn is_suppressed(&self) -> bool {
        let mut until = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        match *until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                *until = None;
                false
            }
            None => false,
        }
    }
}
