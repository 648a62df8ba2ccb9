//! The queue-owning consumer task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use imagededup_pipeline::Pipeline;

use crate::error::DaemonError;
use crate::queue::{ProcessingQueue, QueueEvent};

/// Work the daemon hands off for each drained queue entry.
///
/// Calls block; the daemon runs them on the blocking pool.
pub trait DirectoryProcessor: Send + Sync + 'static {
    /// Process the directory containing `path` (or `path` itself).
    ///
    /// Returns the paths deleted or moved as a result, so the daemon can
    /// drop them from its queue.
    fn process(&self, path: &Path) -> Result<Vec<PathBuf>, DaemonError>;

    /// Drop every store record for `path`.
    fn forget(&self, path: &Path) -> Result<(), DaemonError>;
}

impl DirectoryProcessor for Pipeline {
    fn process(&self, path: &Path) -> Result<Vec<PathBuf>, DaemonError> {
        let result = self.process_directory(path)?;
        let summary = result.summary();
        info!(
            "Processed {}: {} deleted, {} moved, {} failed",
            path.display(),
            summary.deleted,
            summary.moved,
            summary.failed
        );
        Ok(result.removed_paths())
    }

    fn forget(&self, path: &Path) -> Result<(), DaemonError> {
        Pipeline::forget(self, path)?;
        Ok(())
    }
}

/// Counters reported when the daemon stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonStats {
    pub processed: u64,
    pub forgotten: u64,
    pub failed: u64,
}

/// Debounced event consumer.
pub struct Daemon<P> {
    processor: Arc<P>,
    quiescence: Duration,
    tick: Duration,
    cancel: CancellationToken,
}

impl<P: DirectoryProcessor> Daemon<P> {
    /// Create a daemon that drains after `quiescence` without events.
    pub fn new(processor: Arc<P>, quiescence: Duration) -> Self {
        Self {
            processor,
            quiescence,
            tick: quiescence.min(Duration::from_secs(1)),
            cancel: CancellationToken::new(),
        }
    }

    /// How often the debounce timer is checked.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Stop once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Consume events until cancelled or every sender is dropped.
    ///
    /// Errors from individual entries are logged and counted; they never
    /// end the loop.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<QueueEvent>) -> DaemonStats {
        let mut queue = ProcessingQueue::new();
        let mut stats = DaemonStats::default();
        let mut timer = tokio::time::interval(self.tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Daemon started (quiescence {:?}, tick {:?})",
            self.quiescence, self.tick
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Daemon cancelled with {} queued path(s)", queue.len());
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("Event channel closed");
                        break;
                    };
                    self.handle(event, &mut queue, &mut stats).await;
                }
                _ = timer.tick() => {
                    if queue.should_drain(Instant::now(), self.quiescence) {
                        self.drain(&mut queue, &mut stats).await;
                    }
                }
            }
        }

        stats
    }

    async fn handle(&self, event: QueueEvent, queue: &mut ProcessingQueue, stats: &mut DaemonStats) {
        match event {
            QueueEvent::Changed(path) => {
                debug!("Queued {}", path.display());
                queue.add(path, Instant::now());
            }
            QueueEvent::Removed(path) => {
                queue.remove(&path);
                let processor = Arc::clone(&self.processor);
                let target = path.clone();
                match tokio::task::spawn_blocking(move || processor.forget(&target)).await {
                    Ok(Ok(())) => {
                        debug!("Forgot {}", path.display());
                        stats.forgotten += 1;
                    }
                    Ok(Err(e)) => {
                        warn!("Failed to forget {}: {}", path.display(), e);
                        stats.failed += 1;
                    }
                    Err(e) => {
                        error!("Forget task for {} failed: {}", path.display(), e);
                        stats.failed += 1;
                    }
                }
            }
        }
    }

    async fn drain(&self, queue: &mut ProcessingQueue, stats: &mut DaemonStats) {
        info!("Processing {} queued path(s)", queue.len());

        while let Some(path) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                break;
            }

            let processor = Arc::clone(&self.processor);
            let target = path.clone();
            let outcome = tokio::task::spawn_blocking(move || processor.process(&target))
                .await
                .map_err(|e| DaemonError::Task {
                    message: e.to_string(),
                })
                .and_then(|r| r);

            match outcome {
                Ok(resolved) => {
                    stats.processed += 1;
                    for done in resolved {
                        if queue.remove(&done) {
                            debug!("{} resolved while processing {}", done.display(), path.display());
                        }
                    }
                }
                Err(e) => {
                    error!("Error processing {}: {}", path.display(), e);
                    stats.failed += 1;
                }
            }
        }
    }
}
