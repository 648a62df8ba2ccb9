//! JWalk-based parallel file walker.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use jwalk::{Parallelism, WalkDir};
use regex::RegexSet;
use tracing::{debug, warn};

use imagededup_core::DedupConfig;

use crate::error::ScanError;

/// Number of candidate files found below each root, in root order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFileCount {
    counts: IndexMap<PathBuf, u64>,
}

impl DirectoryFileCount {
    /// Record the count for `root`, replacing any earlier one.
    pub fn insert(&mut self, root: impl Into<PathBuf>, count: u64) {
        self.counts.insert(root.into(), count);
    }

    /// Count for a single root.
    pub fn get(&self, root: &Path) -> u64 {
        self.counts.get(root).copied().unwrap_or(0)
    }

    /// Sum over all roots.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Iterate `(root, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &u64)> {
        self.counts.iter()
    }
}

/// Enumerates candidate image files below a root.
///
/// A candidate is a regular file whose extension is in the configured set and
/// whose full path matches none of the exclusion patterns.
#[derive(Debug, Clone)]
pub struct FileWalker {
    recursive: bool,
    extensions: Vec<String>,
    exclusions: RegexSet,
    threads: usize,
}

impl FileWalker {
    /// Build a walker from the run configuration.
    pub fn from_config(config: &DedupConfig) -> Result<Self, ScanError> {
        let exclusions = RegexSet::new(&config.exclusions)
            .map_err(|source| ScanError::InvalidPattern { source })?;
        let extensions = config
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        Ok(Self {
            recursive: config.recursive,
            extensions,
            exclusions,
            threads: config.threads,
        })
    }

    /// Whether `path` passes the extension and exclusion filters.
    ///
    /// Does not touch the filesystem.
    pub fn is_candidate(&self, path: &Path) -> bool {
        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                let e = e.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == e)
            });
        if !extension_ok {
            return false;
        }
        !self.exclusions.is_match(&path.to_string_lossy())
    }

    /// Collect every candidate file below `root` in a stable order.
    ///
    /// Unreadable entries are logged and skipped; only an unusable root is
    /// an error.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let metadata = std::fs::metadata(root).map_err(|e| ScanError::io(root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let parallelism = match self.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: std::time::Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(root)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(1)
            .max_depth(if self.recursive { usize::MAX } else { 1 });

        let mut files = Vec::new();
        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    warn!("Skipping unreadable entry {}: {}", path.display(), err);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if self.is_candidate(&path) {
                files.push(path);
            }
        }

        debug!("Found {} candidate files below {}", files.len(), root.display());
        Ok(files)
    }
}
