//! Filesystem watchers feeding the daemon channel.

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use imagededup_core::{DaemonConfig, ObserverKind};
use imagededup_scan::FileWalker;

use crate::error::DaemonError;
use crate::queue::QueueEvent;

enum ActiveWatcher {
    Native(RecommendedWatcher),
    Polling(PollWatcher),
}

/// Keeps watchers alive. Dropping it stops them.
pub struct WatchHandle {
    watchers: Vec<ActiveWatcher>,
}

impl WatchHandle {
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<&str> = self
            .watchers
            .iter()
            .map(|w| match w {
                ActiveWatcher::Native(_) => "native",
                ActiveWatcher::Polling(_) => "polling",
            })
            .collect();
        f.debug_struct("WatchHandle").field("watchers", &kinds).finish()
    }
}

/// Translate a notify event into queue events.
///
/// Renames with both ends known become a removal plus a change. Access and
/// metadata-only events are ignored.
pub fn map_event(event: &Event) -> Vec<QueueEvent> {
    match &event.kind {
        EventKind::Create(_) => event.paths.iter().cloned().map(QueueEvent::Changed).collect(),
        EventKind::Remove(_) => event.paths.iter().cloned().map(QueueEvent::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => vec![
            QueueEvent::Removed(event.paths[0].clone()),
            QueueEvent::Changed(event.paths[1].clone()),
        ],
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.iter().cloned().map(QueueEvent::Removed).collect()
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => event.paths.iter().cloned().map(QueueEvent::Changed).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// Whether a change to `path` can affect duplicate resolution.
fn is_relevant(walker: &FileWalker, event: &QueueEvent) -> bool {
    match event {
        QueueEvent::Removed(_) => true,
        QueueEvent::Changed(path) => path.is_dir() || walker.is_candidate(path),
    }
}

/// Start one recursive watcher per root, sending events to `tx`.
pub fn watch(
    roots: &[PathBuf],
    config: &DaemonConfig,
    walker: FileWalker,
    tx: UnboundedSender<QueueEvent>,
) -> Result<WatchHandle, DaemonError> {
    let mut watchers = Vec::with_capacity(roots.len());

    for root in roots {
        let tx = tx.clone();
        let walker = walker.clone();
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for queued in map_event(&event) {
                    if is_relevant(&walker, &queued) {
                        debug!("File event: {:?}", queued);
                        let _ = tx.send(queued);
                    }
                }
            }
            Err(e) => warn!("Watcher error: {}", e),
        };

        let watch_err = |source| DaemonError::Watch {
            path: root.clone(),
            source,
        };

        let watcher = match config.observer {
            ObserverKind::Native => {
                let mut w = RecommendedWatcher::new(handler, Config::default()).map_err(watch_err)?;
                w.watch(root, RecursiveMode::Recursive).map_err(watch_err)?;
                ActiveWatcher::Native(w)
            }
            ObserverKind::Polling => {
                let mut w = PollWatcher::new(
                    handler,
                    Config::default().with_poll_interval(config.poll_interval),
                )
                .map_err(watch_err)?;
                w.watch(root, RecursiveMode::Recursive).map_err(watch_err)?;
                ActiveWatcher::Polling(w)
            }
        };

        info!("Watching {} ({})", root.display(), config.observer);
        watchers.push(watcher);
    }

    Ok(WatchHandle { watchers })
}
