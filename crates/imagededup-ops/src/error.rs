//! Error types for file actions.

use std::path::{Path, PathBuf};

use thiserror::Error;

use imagededup_core::StoreError;

/// Errors raised while applying an action.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Filesystem error with path context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A move destination already holds different content.
    #[error("Move target {destination} already exists with different content than {source_path}")]
    ConflictingContent {
        source_path: PathBuf,
        destination: PathBuf,
    },

    /// The store could not drop the record of a removed file.
    #[error("Failed to remove {path} from store: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    /// An empty folder could not be removed.
    #[error("Failed to remove empty folder {path}: {source}")]
    Reclaim {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OpsError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The path the error is about.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } | Self::Store { path, .. } | Self::Reclaim { path, .. } => {
                Some(path)
            }
            Self::ConflictingContent { source_path, .. } => Some(source_path),
        }
    }
}
