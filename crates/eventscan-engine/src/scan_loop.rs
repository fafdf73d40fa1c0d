//! The scan engine — a single background worker that polls the fetch
//! strategy, dispatches in order, and advances the position tracker.
//!
//! Lifecycle is an explicit `Idle → Running → Stopping → Idle` machine
//! behind one mutex; `stop` joins the worker, so no store write can happen
//! after it returns. The worker never exits on its own: transport errors
//! are logged and retried after the base tick, forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use eventscan_core::config::ScanConfig;
use eventscan_core::dispatch::EventDispatcher;
use eventscan_core::error::ScanError;
use eventscan_core::store::Store;
use eventscan_core::tracker::PositionTracker;

use crate::strategy::FetchStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Idle,
    Running,
    Stopping,
}

struct Lifecycle {
    state: EngineState,
    stop_tx: Option<watch::Sender<bool>>,
    worker: Option<JoinHandle<()>>,
}

struct Inner {
    config: ScanConfig,
    strategy: Arc<dyn FetchStrategy>,
    dispatcher: EventDispatcher,
    store: Arc<dyn Store>,
    tracker: PositionTracker,
    /// Set by `set_position`; makes the next start skip checkpoint
    /// recovery so the operator's rewind wins.
    explicit_rewind: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

/// The ingestion engine control surface.
///
/// Cheap to clone the handle via `Arc` internally; `position()` is safe to
/// call from any task at any time.
pub struct ScanEngine {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ScanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEngine").finish_non_exhaustive()
    }
}

impl ScanEngine {
    /// Construct an engine from validated parts. Prefer
    /// [`crate::EngineBuilder`].
    pub fn new(
        config: ScanConfig,
        strategy: Arc<dyn FetchStrategy>,
        dispatcher: EventDispatcher,
        store: Arc<dyn Store>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        let start = config.start_position;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                strategy,
                dispatcher,
                store,
                tracker: PositionTracker::new(start),
                explicit_rewind: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle {
                    state: EngineState::Idle,
                    stop_tx: None,
                    worker: None,
                }),
            }),
        })
    }

    /// Spawn the background worker. Fails with
    /// [`ScanError::AlreadyRunning`] if the engine is not idle.
    pub fn start(&self) -> Result<(), ScanError> {
        let mut lifecycle = self.inner.lifecycle.lock().unwrap();
        if lifecycle.state != EngineState::Idle {
            return Err(ScanError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let worker = tokio::spawn(async move { run_worker(inner, stop_rx).await });

        lifecycle.state = EngineState::Running;
        lifecycle.stop_tx = Some(stop_tx);
        lifecycle.worker = Some(worker);
        info!("scan engine started");
        Ok(())
    }

    /// Signal the worker to stop and wait for it to drain.
    ///
    /// After `stop` returns no further store writes happen until the next
    /// `start`. Fails with [`ScanError::NotRunning`] if the engine is not
    /// running (including while another `stop` is in flight).
    pub async fn stop(&self) -> Result<(), ScanError> {
        let (stop_tx, worker) = {
            let mut lifecycle = self.inner.lifecycle.lock().unwrap();
            if lifecycle.state != EngineState::Running {
                return Err(ScanError::NotRunning);
            }
            lifecycle.state = EngineState::Stopping;
            (lifecycle.stop_tx.take(), lifecycle.worker.take())
        };

        if let Some(tx) = stop_tx {
            let _ = tx.send(true);
        }
        if let Some(handle) = worker {
            let _ = handle.await;
        }

        self.inner.lifecycle.lock().unwrap().state = EngineState::Idle;
        info!(position = self.position(), "scan engine stopped");
        Ok(())
    }

    /// Rewind (or fast-forward) the frontier before a restart. Rejected
    /// while the engine is running; an explicit position survives the next
    /// start instead of being overwritten by checkpoint recovery.
    pub fn set_position(&self, position: i64) -> Result<(), ScanError> {
        let lifecycle = self.inner.lifecycle.lock().unwrap();
        if lifecycle.state != EngineState::Idle {
            return Err(ScanError::AlreadyRunning);
        }
        self.inner.tracker.set(position);
        self.inner.explicit_rewind.store(true, Ordering::Release);
        Ok(())
    }

    /// The last processed position. Lock-free; safe for concurrent
    /// callers (health checks, lag metrics).
    pub fn position(&self) -> i64 {
        self.inner.tracker.get()
    }
}

/// Interruptible wait. Returns `true` when the stop signal fired.
async fn wait_for_stop(stop_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    if *stop_rx.borrow() {
        return true;
    }
    if delay.is_zero() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        changed = stop_rx.changed() => changed.is_err() || *stop_rx.borrow(),
    }
}

async fn run_worker(inner: Arc<Inner>, mut stop_rx: watch::Receiver<bool>) {
    // Seed the tracker unless the operator rewound it explicitly.
    if !inner.explicit_rewind.swap(false, Ordering::AcqRel) {
        match inner.store.latest_state().await {
            // The durable checkpoint always wins over the configured start,
            // which only seeds an empty store.
            Ok(Some(state)) => {
                inner.tracker.set(inner.strategy.resume_position(&state));
                info!(position = inner.tracker.get(), "resuming from checkpoint");
            }
            Ok(None) => {
                inner.tracker.set(inner.config.start_position);
                info!(
                    position = inner.config.start_position,
                    "no checkpoint, starting from configured position"
                );
            }
            Err(e) => {
                warn!(error = %e, "checkpoint read failed, using configured start");
                inner.tracker.set(inner.config.start_position);
            }
        }
    }

    // Persist genesis metadata once; failure is logged, not fatal.
    match inner.strategy.genesis().await {
        Ok(Some(record)) => match inner.store.create_genesis(record).await {
            Ok(rows) => debug!(rows, "genesis record persisted"),
            Err(e) => warn!(error = %e, "failed to persist genesis record"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "genesis fetch failed"),
    }

    let mut delay = inner.config.tick_interval;
    loop {
        if wait_for_stop(&mut stop_rx, delay).await {
            break;
        }

        let after = inner.tracker.get();
        let batch = match inner.strategy.next_batch(after).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(position = after, error = %e, "fetch failed, retrying");
                delay = inner.config.tick_interval;
                continue;
            }
        };

        // A stop that arrived during the fetch drops the batch unprocessed;
        // nothing was committed, so it is refetched on the next start.
        if *stop_rx.borrow() {
            break;
        }

        if batch.items.is_empty() {
            delay = inner.config.idle_backoff;
            continue;
        }

        let dispatched = inner
            .dispatcher
            .dispatch_all(batch.items, &inner.tracker)
            .await;

        if let Some(e) = batch.interrupted {
            warn!(
                position = inner.tracker.get(),
                error = %e,
                "batch truncated, resuming after committed frontier"
            );
            delay = inner.config.tick_interval;
            continue;
        }

        delay = match dispatched {
            // Caught up: ease off the node.
            Ok(_) if batch.synced => inner.config.idle_backoff,
            // Backlog likely remains: drain immediately.
            Ok(_) => Duration::ZERO,
            // Write failure was logged by the dispatcher; the frontier
            // stayed put, so the failed item is refetched next cycle.
            Err(_) => inner.config.tick_interval,
        };
    }
    debug!("scan worker exited");
}

// ─── Tests ───────────────────────────────────────────────────────────────────
