//! Moving duplicates under a target directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::compare::same_content;
use crate::error::OpsError;

/// What a move did with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The source now lives at the destination.
    Moved,
    /// The destination already held identical bytes; the source was deleted.
    DiscardedIdentical,
}

/// Destination for `source` below `target`, mirroring its absolute path.
///
/// `/photos/2020/a.jpg` under `/dupes` becomes `/dupes/photos/2020/a.jpg`.
pub fn mirror_destination(target: &Path, source: &Path) -> PathBuf {
    let relative: PathBuf = source
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    target.join(relative)
}

/// Move a single file to `dest`, creating parent directories.
///
/// An existing destination is never overwritten: identical content discards
/// the source, differing content is an error and leaves both files alone.
pub fn move_file(source: &Path, dest: &Path) -> Result<MoveOutcome, OpsError> {
    if dest.exists() {
        let identical = same_content(source, dest).map_err(|e| OpsError::io(dest, e))?;
        if !identical {
            return Err(OpsError::ConflictingContent {
                source_path: source.to_path_buf(),
                destination: dest.to_path_buf(),
            });
        }
        debug!(
            "{} already exists with identical content, removing source",
            dest.display()
        );
        fs::remove_file(source).map_err(|e| OpsError::io(source, e))?;
        return Ok(MoveOutcome::DiscardedIdentical);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| OpsError::io(parent, e))?;
    }

    // Try rename first (fast path for same filesystem)
    if fs::rename(source, dest).is_ok() {
        return Ok(MoveOutcome::Moved);
    }

    // Fall back to copy + delete for cross-filesystem moves
    fs::copy(source, dest).map_err(|e| OpsError::io(source, e))?;
    fs::remove_file(source).map_err(|e| OpsError::io(source, e))?;
    Ok(MoveOutcome::Moved)
}
