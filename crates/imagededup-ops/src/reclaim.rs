//! Detection and removal of folders emptied by a run.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use tracing::{info, warn};

use crate::error::OpsError;

/// Folders that became empty during a run, children before parents.
pub type EmptyFolderSet = IndexSet<PathBuf>;

/// Finds folders left empty by deleted or moved files.
///
/// A folder qualifies only if at least one of its direct children was
/// removed by this run (a file, or a subfolder that itself qualified) and
/// nothing else remains in it. Folders that were empty before the run are
/// never reported, and neither are the roots themselves.
#[derive(Debug, Clone)]
pub struct EmptyFolderReclaimer {
    roots: Vec<PathBuf>,
}

impl EmptyFolderReclaimer {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Compute the empty folder set for the removed `files`.
    ///
    /// Works the same whether `files` are still on disk (dry run) or
    /// already gone.
    pub fn find(&self, files: &HashSet<PathBuf>) -> EmptyFolderSet {
        let parents: HashSet<&Path> = files.iter().filter_map(|f| f.parent()).collect();
        let mut result = EmptyFolderSet::new();

        for root in &self.roots {
            visit(root, true, files, &parents, &mut result);
        }
        result
    }

    /// Remove every folder in `folders`, in order.
    ///
    /// Each folder is attempted even after a failure. A folder that is no
    /// longer empty means something else wrote to it since
    /// [`find`](Self::find); its parents then fail too.
    pub fn remove(&self, folders: &EmptyFolderSet) -> ReclaimReport {
        let mut report = ReclaimReport::default();
        for folder in folders {
            match fs::remove_dir(folder) {
                Ok(()) => {
                    info!("Removed empty folder {}", folder.display());
                    report.removed.insert(folder.clone());
                }
                Err(source) => {
                    warn!("Could not remove {}: {}", folder.display(), source);
                    report.errors.push(OpsError::Reclaim {
                        path: folder.clone(),
                        source,
                    });
                }
            }
        }
        report
    }
}

/// What [`EmptyFolderReclaimer::remove`] did.
#[derive(Debug, Default)]
pub struct ReclaimReport {
    /// Folders actually removed, in removal order.
    pub removed: EmptyFolderSet,
    pub errors: Vec<OpsError>,
}

/// Post-order walk. Returns whether `dir` was added to `result`.
fn visit(
    dir: &Path,
    is_root: bool,
    files: &HashSet<PathBuf>,
    parents: &HashSet<&Path>,
    result: &mut EmptyFolderSet,
) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read {}: {}", dir.display(), e);
            return false;
        }
    };

    let mut children: Vec<_> = entries.flatten().collect();
    children.sort_by_key(|e| e.file_name());

    let mut excluded = parents.contains(dir);
    let mut remaining = 0usize;

    for child in children {
        let path = child.path();
        let is_dir = child.file_type().map(|t| t.is_dir()).unwrap_or(false);

        if is_dir {
            if visit(&path, false, files, parents, result) {
                excluded = true;
            } else {
                remaining += 1;
            }
        } else if files.contains(&path) {
            excluded = true;
        } else {
            remaining += 1;
        }
    }

    if !is_root && excluded && remaining == 0 {
        result.insert(dir.to_path_buf());
        return true;
    }
    false
}
