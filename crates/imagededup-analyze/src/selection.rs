//! Keep/remove selection for ranked duplicate groups.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use imagededup_core::FileRecord;

use crate::error::RankError;

/// Paths already resolved during the current discovery pass.
#[derive(Debug, Clone, Default)]
pub struct ProcessedSet {
    paths: HashSet<PathBuf>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a path as resolved. Returns `false` if it already was.
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Outcome of selecting within one group.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Records to keep. The first entry is the best ranked copy.
    pub keep: Vec<FileRecord>,
    /// Records to delete or move.
    pub remove: Vec<FileRecord>,
}

impl Selection {
    /// The best ranked record of the group.
    pub fn kept(&self) -> &FileRecord {
        &self.keep[0]
    }
}

/// Splits a ranked group into keep and remove sets.
///
/// The first record is always kept. With a maximum modification time delta,
/// any other record whose modification time differs from the kept record's
/// by more than the delta is kept as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateSelector {
    max_delta: Option<Duration>,
}

impl CandidateSelector {
    pub fn new(max_delta: Option<Duration>) -> Self {
        Self { max_delta }
    }

    /// Select within `ranked`, adding every record to `processed`.
    pub fn select(
        &self,
        ranked: Vec<FileRecord>,
        processed: &mut ProcessedSet,
    ) -> Result<Selection, RankError> {
        let mut records = ranked.into_iter();
        let kept = records.next().ok_or(RankError::EmptyGroup)?;
        processed.insert(kept.path.clone());

        let kept_micros = kept.metadata.modification_time.timestamp_micros();
        let mut keep = vec![kept];
        let mut remove = Vec::new();

        for record in records {
            processed.insert(record.path.clone());

            let outside_window = self.max_delta.is_some_and(|delta| {
                let diff = (record.metadata.modification_time.timestamp_micros() - kept_micros)
                    .unsigned_abs();
                u128::from(diff) > delta.as_micros()
            });

            if outside_window {
                debug!(
                    "Keeping {} (modification time outside window)",
                    record.path.display()
                );
                keep.push(record);
            } else {
                remove.push(record);
            }
        }

        Ok(Selection { keep, remove })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use imagededup_core::FileMetadata;

    fn record(path: &str, secs: i64) -> FileRecord {
        FileRecord::new(path, FileMetadata::new(1, Utc.timestamp_opt(secs, 0).unwrap()))
    }

    #[test]
    fn test_first_is_kept_rest_removed() {
        let mut processed = ProcessedSet::new();
        let selection = CandidateSelector::new(None)
            .select(
                vec![record("/a.jpg", 0), record("/b.jpg", 0), record("/c.jpg", 0)],
                &mut processed,
            )
            .unwrap();

        assert_eq!(selection.kept().path, PathBuf::from("/a.jpg"));
        assert_eq!(selection.keep.len(), 1);
        assert_eq!(selection.remove.len(), 2);
        assert_eq!(processed.len(), 3);
    }

    #[test]
    fn test_delta_boundary_is_exclusive() {
        let mut processed = ProcessedSet::new();
        let selection = CandidateSelector::new(Some(Duration::from_secs(60)))
            .select(
                vec![record("/a.jpg", 1000), record("/b.jpg", 1060), record("/c.jpg", 1061)],
                &mut processed,
            )
            .unwrap();

        let kept: Vec<_> = selection.keep.iter().map(|r| r.path.clone()).collect();
        assert_eq!(kept, vec![PathBuf::from("/a.jpg"), PathBuf::from("/c.jpg")]);
        assert_eq!(selection.remove[0].path, PathBuf::from("/b.jpg"));
    }

    #[test]
    fn test_empty_group_rejected() {
        let mut processed = ProcessedSet::new();
        let err = CandidateSelector::default()
            .select(vec![], &mut processed)
            .unwrap_err();
        assert_eq!(err, RankError::EmptyGroup);
        assert!(processed.is_empty());
    }
}
