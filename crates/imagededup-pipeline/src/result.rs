//! Run results: duplicate groups, the action map and reclaimed folders.

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use imagededup_core::{Action, FileRecord};
use imagededup_ops::ActionOutcome;

use crate::error::PipelineError;

/// A kept record and the other members of its group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub kept: FileRecord,
    /// Every other member, including ones kept by the time window.
    pub members: Vec<FileRecord>,
}

/// An action that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Counts for the end-of-run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub groups_with_duplicates: usize,
    pub moved: usize,
    pub deleted: usize,
    pub reclaimed_folders: usize,
    pub failed: usize,
}

/// Everything one run decided and did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    pub dry_run: bool,
    /// Groups keyed by the kept path, in discovery order.
    pub groups: IndexMap<PathBuf, DuplicateGroup>,
    /// The action assigned to every path seen in a group.
    pub actions: IndexMap<PathBuf, Action>,
    /// What executing each removal did.
    pub outcomes: IndexMap<PathBuf, ActionOutcome>,
    /// Folders emptied by this run (or that would be, under dry run).
    pub reclaimed: IndexSet<PathBuf>,
    pub failures: Vec<ActionFailure>,
}

impl RunResult {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Assign `action` to `path`.
    ///
    /// Re-assigning the same action is a no-op; a different one is an error.
    pub fn set_action(&mut self, path: &Path, action: Action) -> Result<(), PipelineError> {
        match self.actions.get(path) {
            Some(existing) if *existing != action => Err(PipelineError::ConflictingAction {
                path: path.to_path_buf(),
                existing: *existing,
                requested: action,
            }),
            Some(_) => Ok(()),
            None => {
                self.actions.insert(path.to_path_buf(), action);
                Ok(())
            }
        }
    }

    pub fn action(&self, path: &Path) -> Option<Action> {
        self.actions.get(path).copied()
    }

    /// Record a resolved group.
    pub fn add_group(&mut self, kept: FileRecord, members: Vec<FileRecord>) {
        self.groups
            .insert(kept.path.clone(), DuplicateGroup { kept, members });
    }

    /// Paths with a delete or move action, in assignment order.
    pub fn removals(&self) -> impl Iterator<Item = (&PathBuf, Action)> {
        self.actions
            .iter()
            .filter(|(_, action)| action.is_removal())
            .map(|(path, action)| (path, *action))
    }

    pub fn add_failure(&mut self, path: impl Into<PathBuf>, message: impl Into<String>) {
        self.failures.push(ActionFailure {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn has_failed(&self, path: &Path) -> bool {
        self.failures.iter().any(|f| f.path == path)
    }

    /// Paths that were (or would be) removed successfully.
    pub fn removed_paths(&self) -> Vec<PathBuf> {
        self.removals()
            .filter(|(path, _)| !self.has_failed(path))
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            groups_with_duplicates: self
                .groups
                .values()
                .filter(|g| !g.members.is_empty())
                .count(),
            reclaimed_folders: self.reclaimed.len(),
            failed: self.failures.len(),
            ..RunSummary::default()
        };
        for (path, action) in self.removals() {
            let vanished = matches!(self.outcomes.get(path), Some(ActionOutcome::Vanished));
            if vanished || self.has_failed(path) {
                continue;
            }
            match action {
                Action::Move => summary.moved += 1,
                Action::Delete => summary.deleted += 1,
                Action::None => {}
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use imagededup_core::FileMetadata;

    fn record(path: &str) -> FileRecord {
        FileRecord::new(path, FileMetadata::new(1, Utc::now()))
    }

    #[test]
    fn test_set_action_conflict() {
        let mut result = RunResult::new(false);
        let path = Path::new("/p/a.jpg");

        result.set_action(path, Action::None).unwrap();
        result.set_action(path, Action::None).unwrap();
        let err = result.set_action(path, Action::Delete).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::ConflictingAction {
                existing: Action::None,
                requested: Action::Delete,
                ..
            }
        ));
        assert_eq!(result.action(path), Some(Action::None));
    }

    #[test]
    fn test_summary_counts() {
        let mut result = RunResult::new(false);
        result.add_group(record("/p/a.jpg"), vec![record("/p/b.jpg"), record("/p/c.jpg")]);
        result.add_group(record("/p/x.jpg"), vec![]);
        result.set_action(Path::new("/p/a.jpg"), Action::None).unwrap();
        result.set_action(Path::new("/p/b.jpg"), Action::Move).unwrap();
        result.set_action(Path::new("/p/c.jpg"), Action::Move).unwrap();
        result.set_action(Path::new("/p/d.jpg"), Action::Delete).unwrap();
        result.set_action(Path::new("/p/e.jpg"), Action::Move).unwrap();
        result
            .outcomes
            .insert(PathBuf::from("/p/e.jpg"), ActionOutcome::Vanished);
        result.add_failure("/p/c.jpg", "target exists");
        result.reclaimed.insert(PathBuf::from("/p/old"));

        assert_eq!(
            result.summary(),
            RunSummary {
                groups_with_duplicates: 1,
                moved: 1,
                deleted: 1,
                reclaimed_folders: 1,
                failed: 1,
            }
        );
        assert_eq!(
            result.removed_paths(),
            vec![
                PathBuf::from("/p/b.jpg"),
                PathBuf::from("/p/d.jpg"),
                PathBuf::from("/p/e.jpg")
            ]
        );
    }
}
