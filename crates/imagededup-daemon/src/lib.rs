//! Daemon mode for imagededup.
//!
//! Filesystem events are sent over a channel to a single consumer task
//! that owns the [`ProcessingQueue`]. The queue drains once no event has
//! arrived for the quiescence interval, handing each queued directory to a
//! [`DirectoryProcessor`]. Removals skip the queue and drop store records
//! right away.

mod daemon;
mod error;
mod queue;
mod watch;

pub use daemon::{Daemon, DaemonStats, DirectoryProcessor};
pub use error::DaemonError;
pub use queue::{ProcessingQueue, QueueEvent};
pub use watch::{WatchHandle, map_event, watch};
