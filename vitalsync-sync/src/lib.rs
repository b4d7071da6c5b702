//! Bidirectional health store sync for vitalsync.
//!
//! Keeps the app's local weight, sleep and hydration entries consistent
//! with the platform health store, in both directions.
//!
//! # Architecture
//!
//! - **Adapter**: the platform store behind [`HealthStoreAdapter`], injected
//!   into every reconciler. [`MockHealthStore`] stands in for it in tests.
//! - **Matching**: the tolerance rule deciding whether a local entry and an
//!   external record are the same event, plus pure merge planning.
//! - **Reconciler**: one per domain, generic over the measurement type. Runs
//!   the three reconciliation modes and writes local edits through.
//! - **Main context**: a dedicated thread that owns every piece of
//!   UI-observable state. [`MainBound`] is the only way in.
//! - **Notifier**: tells subscribed listeners which domain changed.
//!
//! ## Reconciliation modes
//!
//! 1. **Incremental**: fetch the delta since the stored anchor, add what is
//!    new, drop what was deleted externally, store the new anchor.
//! 2. **Historical import**: fetch everything within the horizon and merge
//!    it with a looser tolerance. Nothing is removed.
//! 3. **Reset and reconcile**: compare the complete external state with the
//!    local store and remove external-synced entries that are gone.
//!    Manual entries are never removed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vitalsync_sync::{HealthSync, MockHealthStore, SyncConfig};
//! use vitalsync_types::Domain;
//!
//! # async fn run() -> vitalsync_sync::SyncResult<()> {
//! let adapter = Arc::new(MockHealthStore::new());
//! let sync = HealthSync::open_in_memory(adapter, SyncConfig::default())?;
//! sync.set_sync_enabled(Domain::Weight, true).await?;
//! sync.start()?;
//!
//! let report = sync.weight().sync_incremental().await?;
//! println!("added {} entries", report.added);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
mod config;
mod error;
mod health_sync;
mod local;
mod main_context;
pub mod matching;
mod notifier;
mod reconciler;
mod state;
mod suppression;

pub use adapter::mock::{MockCalls, MockHealthStore};
pub use adapter::{AdapterError, AdapterResult, ChangeCallback, HealthStoreAdapter};
pub use config::{MAX_HISTORICAL_HORIZON_DAYS, MAX_TOLERANCE_SECS, SyncConfig, TolerancePolicy};
pub use error::{SyncError, SyncResult};
pub use health_sync::HealthSync;
pub use local::{DomainState, LocalState, Tracked};
pub use main_context::{MainBound, MainContext};
pub use notifier::{ChangeListener, ChangeNotifier};
pub use reconciler::Reconciler;
pub use state::{ReconcileReport, SkipReason, SyncMode, SyncStatus};
pub use suppression::ObserverSuppression;
