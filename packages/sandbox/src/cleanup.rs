// ABOUTME: Background task that periodically destroys old stopped sandboxes
// ABOUTME: Wraps SandboxManager::cleanup_stopped_sandboxes in a start/stop-able tokio loop

use crate::config::SandboxConfig;
use crate::manager::SandboxManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

/// A spawned loop and the signal that ends it
struct Worker {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

/// Periodic sweeper for stopped sandboxes
pub struct CleanupTask {
    manager: Arc<SandboxManager>,
    interval: Duration,
    older_than_hours: u64,
    worker: Mutex<Option<Worker>>,
}

impl CleanupTask {
    /// Interval and age threshold come from the manager's configuration
    pub fn new(manager: Arc<SandboxManager>) -> Self {
        let config: &SandboxConfig = manager.config();
        let interval = config.cleanup_interval();
        let older_than_hours = config.cleanup_older_than_hours;
        Self::with_schedule(manager, interval, older_than_hours)
    }

    pub fn with_schedule(
        manager: Arc<SandboxManager>,
        interval: Duration,
        older_than_hours: u64,
    ) -> Self {
        Self {
            manager,
            interval,
            older_than_hours,
            worker: Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Start the cleanup loop; a second call while running is a no-op
    pub async fn start(&self) {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return;
        }

        let manager = self.manager.clone();
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();
        let interval = self.interval;
        let older_than_hours = self.older_than_hours;

        let handle = tokio::spawn(async move {
            info!(
                "Sandbox cleanup started (every {:?}, older than {}h)",
                interval, older_than_hours
            );

            loop {
                tokio::select! {
                    _ = time::sleep(interval) => {}
                    _ = signal.notified() => {
                        info!("Sandbox cleanup stopped");
                        break;
                    }
                }

                let removed = manager.cleanup_stopped_sandboxes(older_than_hours).await;
                debug!("Cleanup pass removed {} sandbox(es)", removed);
            }
        });

        *worker = Some(Worker { handle, shutdown });
    }

    /// Stop the cleanup loop and wait for it to exit.
    ///
    /// A pass already in progress finishes first; the loop never waits out the
    /// rest of its interval.
    pub async fn stop(&self) {
        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };

        // notify_one stores a permit, so a loop busy in a pass still sees it
        worker.shutdown.notify_one();
        if let Err(e) = worker.handle.await {
            warn!("Sandbox cleanup loop ended abnormally: {}", e);
        }
    }
}
