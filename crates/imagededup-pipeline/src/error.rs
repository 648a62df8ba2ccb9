//! Error types for pipeline runs.

use std::path::PathBuf;

use thiserror::Error;

use imagededup_analyze::RankError;
use imagededup_core::{Action, ConfigError, StoreError};
use imagededup_scan::{Phase, ScanError};

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A path was given two different actions in one run.
    ///
    /// Signals overlapping duplicate groups.
    #[error("Conflicting action for {path}: already {existing}, requested {requested}")]
    ConflictingAction {
        path: PathBuf,
        existing: Action,
        requested: Action,
    },

    /// An analysis worker panicked.
    #[error("Worker panicked during {phase}: {message}")]
    WorkerPanicked { phase: Phase, message: String },

    /// Cancellation was observed before `phase` started.
    #[error("Cancelled before {phase}")]
    Cancelled { phase: Phase },

    /// The analysis thread pool could not be created.
    #[error("Failed to build worker pool: {message}")]
    Pool { message: String },

    /// A directory handed to the pipeline lies outside every root.
    #[error("{path} is not inside any configured root")]
    OutsideRoots { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Rank(#[from] RankError),
}
