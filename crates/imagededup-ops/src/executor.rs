//! Applies per-path actions to disk and the signature store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use imagededup_core::{Action, SignatureStore};

use crate::error::OpsError;
use crate::move_op::{MoveOutcome, mirror_destination, move_file};

/// What executing one action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action was `None`.
    Kept,
    /// The file was deleted.
    Deleted,
    /// The file was moved to `destination`.
    Moved { destination: PathBuf },
    /// `destination` already held the same bytes; the source was deleted.
    DiscardedIdentical { destination: PathBuf },
    /// The source was already gone; neither disk nor store was touched.
    Vanished,
    /// Dry run: nothing was touched.
    Simulated,
}

/// Executes delete and move actions.
///
/// Under dry run every step except the filesystem mutation and the store
/// removal happens.
#[derive(Clone)]
pub struct ActionExecutor {
    store: Arc<dyn SignatureStore>,
    dry_run: bool,
    target: Option<PathBuf>,
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("dry_run", &self.dry_run)
            .field("target", &self.target)
            .finish()
    }
}

impl ActionExecutor {
    /// Create an executor. `target` is the move destination root, if any.
    pub fn new(store: Arc<dyn SignatureStore>, dry_run: bool, target: Option<PathBuf>) -> Self {
        Self {
            store,
            dry_run,
            target,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Apply `action` to `path`.
    pub fn execute(&self, path: &Path, action: Action) -> Result<ActionOutcome, OpsError> {
        match action {
            Action::None => Ok(ActionOutcome::Kept),
            Action::Delete => self.delete(path),
            Action::Move => self.relocate(path),
        }
    }

    fn delete(&self, path: &Path) -> Result<ActionOutcome, OpsError> {
        if self.dry_run {
            info!("Would delete {}", path.display());
            return Ok(ActionOutcome::Simulated);
        }

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} already gone", path.display());
            }
            Err(e) => return Err(OpsError::io(path, e)),
        }
        self.forget(path)?;
        info!("Deleted {}", path.display());
        Ok(ActionOutcome::Deleted)
    }

    fn relocate(&self, path: &Path) -> Result<ActionOutcome, OpsError> {
        let Some(target) = &self.target else {
            return self.delete(path);
        };
        let destination = mirror_destination(target, path);

        if self.dry_run {
            info!(
                "Would move {} to {}",
                path.display(),
                destination.display()
            );
            return Ok(ActionOutcome::Simulated);
        }

        if !path.exists() {
            debug!("{} already gone, nothing to move", path.display());
            return Ok(ActionOutcome::Vanished);
        }

        let outcome = move_file(path, &destination)?;
        self.forget(path)?;
        info!("Moved {} to {}", path.display(), destination.display());

        Ok(match outcome {
            MoveOutcome::Moved => ActionOutcome::Moved { destination },
            MoveOutcome::DiscardedIdentical => ActionOutcome::DiscardedIdentical { destination },
        })
    }

    fn forget(&self, path: &Path) -> Result<(), OpsError> {
        self.store.remove(path).map_err(|source| OpsError::Store {
            path: path.to_path_buf(),
            source,
        })
    }
}
