//! Error types for daemon mode.

use std::path::PathBuf;

use thiserror::Error;

use imagededup_pipeline::PipelineError;

/// Errors raised by the daemon or its watchers.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Processing a queued path failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A watcher could not be set up for a root.
    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// A processing task panicked or was aborted.
    #[error("Processing task failed: {message}")]
    Task { message: String },
}
