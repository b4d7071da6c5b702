//! The main execution context.
//!
//! All UI-observable state (local entries, preferences, anchors, sync
//! status) lives on one dedicated thread. Adapter I/O runs on the tokio
//! runtime; its results are handed to [`MainBound::update`], which runs the
//! mutation as a job on the main thread and awaits the outcome. `MainBound`
//! has no other accessor, so a code path that forgets to hop back onto the
//! main context does not compile.

use crate::error::{SyncError, SyncResult};
use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static ON_MAIN: Cell<bool> = const { Cell::new(false) };
}

/// Handle to the main execution context. Cloning is cheap; the thread stops
/// once every handle is dropped.
#[derive(Clone)]
pub struct MainContext {
    jobs: mpsc::UnboundedSender<Job>,
}

impl std::fmt::Debug for MainContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainContext")
            .field("closed", &self.jobs.is_closed())
            .finish()
    }
}

impl MainContext {
    /// Starts the main context on a new named thread.
    pub fn spawn(thread_name: &str) -> SyncResult<Self> {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                ON_MAIN.with(|flag| flag.set(true));
                while let Some(job) = rx.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("main context job panicked");
                    }
                }
                debug!("main context stopped");
            })
            .map_err(|e| SyncError::MainContextSpawn(e.to_string()))?;
        Ok(Self { jobs })
    }

    /// Whether the caller is running on the main context.
    #[must_use]
    pub fn is_current() -> bool {
        ON_MAIN.with(Cell::get)
    }

    /// Queues a job without waiting for it.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> SyncResult<()> {
        self.jobs
            .send(Box::new(job))
            .map_err(|_| SyncError::MainContextClosed)
    }

    /// Runs `f` on the main context and returns its result.
    pub async fn run<R, F>(&self, f: F) -> SyncResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.dispatch(move || {
            let _ = tx.send(f());
        })?;
        rx.await.map_err(|_| SyncError::MainContextClosed)
    }
}

/// State that may only be touched on the main context.
pub struct MainBound<T> {
    main: MainContext,
    value: Arc<Mutex<T>>,
}

impl<T> Clone for MainBound<T> {
    fn clone(&self) -> Self {
        Self {
            main: self.main.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: Send + 'static> MainBound<T> {
    pub fn new(main: MainContext, value: T) -> Self {
        Self {
            main,
            value: Arc::new(Mutex::new(value)),
        }
    }

    /// Mutates the value on the main context.
    pub async fn update<R, F>(&self, f: F) -> SyncResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut T) -> R + Send + 'static,
    {
        let value = Arc::clone(&self.value);
        self.main
            .run(move || {
                let mut guard = value.lock().unwrap_or_else(PoisonError::into_inner);
                f(&mut guard)
            })
            .await
    }

    /// Reads the value on the main context.
    pub async fn read<R, F>(&self, f: F) -> SyncResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&T) -> R + Send + 'static,
    {
        self.update(move |value| f(&*value)).await
    }
}
