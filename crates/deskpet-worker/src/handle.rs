//! Cooperative start/stop lifecycle for [`BackgroundWorker`], grounded in
//! the teacher's `SchedulerEngine::run`/`SchedulerHandle` shutdown dance
//! (`tokio::select!` between a tick interval and a `watch::Receiver<bool>`).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::info;

use crate::worker::{BackgroundWorker, TICK_INTERVAL_SECS};

/// Bound on how long [`WorkerHandle::stop`] waits for the loop task to
/// notice the shutdown signal and return.
const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Owns the running tick loop's join handle and shutdown signal.
pub struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn `worker`'s tick loop on the current Tokio runtime.
    pub fn start(worker: Arc<BackgroundWorker>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(TICK_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        worker.tick().await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("background worker shutting down");
                            break;
                        }
                    }
                }
            }
        });
        Self { shutdown_tx, join }
    }

    /// Signal shutdown and wait (bounded) for the loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        if tokio::time::timeout(timeout, self.join).await.is_err() {
            tracing::warn!("background worker did not stop within {SHUTDOWN_TIMEOUT_SECS}s");
        }
    }
}
