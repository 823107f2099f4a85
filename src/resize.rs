// ABOUTME: Polls the local terminal size and reports changes.
// ABOUTME: Runs as a background task with an explicit stop signal.

use crate::terminal::{GeometrySource, TerminalGeometry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

/// Default polling period.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Remembers the last size sent to the server and spots changes.
pub struct ResizeWatcher {
    source: Arc<dyn GeometrySource>,
    last: TerminalGeometry,
}

impl ResizeWatcher {
    /// `initial` is the size the pseudo-terminal was requested with.
    pub fn new(source: Arc<dyn GeometrySource>, initial: TerminalGeometry) -> Self {
        Self {
            source,
            last: initial,
        }
    }

    pub fn last(&self) -> TerminalGeometry {
        self.last
    }

    /// Read the current size. Returns it once if columns or rows changed
    /// since the last report, otherwise `None`.
    pub async fn poll(&mut self) -> Option<TerminalGeometry> {
        let current = self.source.geometry().await?;
        if current.same_size(&self.last) {
            return None;
        }
        self.last = current;
        Some(current)
    }

    /// Poll every `interval` in a background task, sending changes to `tx`.
    ///
    /// The task runs until [`ResizeHandle::stop`] is called or the receiver
    /// is dropped.
    pub fn spawn(mut self, interval: Duration, tx: mpsc::Sender<TerminalGeometry>) -> ResizeHandle {
        let shutdown = Arc::new(Notify::new());
        let shutdown_rx = Arc::clone(&shutdown);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.notified() => {
                        tracing::debug!("resize watcher stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Some(geometry) = self.poll().await {
                            if tx.send(geometry).await.is_err() {
                                tracing::debug!("session gone, resize watcher exiting");
                                break;
                            }
                        }
                    }
                }
            }
        });

        ResizeHandle { shutdown, task }
    }
}

/// Handle to a running resize watcher.
#[derive(Debug)]
pub struct ResizeHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ResizeHandle {
    /// Signal the watcher to stop and wait for it to finish.
    pub async fn stop(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            tracing::debug!("resize watcher task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
