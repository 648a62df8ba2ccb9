//! Quality ranking of duplicate groups.
//!
//! Every [`PrioritizationRule`] maps a record to one [`SortKey`] where a
//! smaller key is preferred. The configured rules form a composite key with
//! the absolute path string appended as the final tie-breaker, so the order
//! is total and independent of input order.

use std::cmp::Ordering;

use imagededup_core::{FileRecord, PrioritizationRule};

use crate::error::RankError;

/// One component of the composite sort key. Smaller sorts first.
#[derive(Debug, Clone)]
pub enum SortKey {
    Int(i128),
    Float(f64),
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Int(_) => 0,
            Self::Float(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

type KeyFn = fn(&FileRecord) -> SortKey;

fn contains_copy(record: &FileRecord) -> bool {
    record.file_name().to_lowercase().contains("copy")
}

fn mtime(record: &FileRecord) -> i128 {
    i128::from(record.metadata.modification_time.timestamp_micros())
}

// Distance and score are negated through their sign only; `-0.0` and `0.0`
// never meet because one rule applies the same transform to every record.
fn registry(rule: PrioritizationRule) -> KeyFn {
    use PrioritizationRule::*;

    match rule {
        HigherPixelCount => |r| SortKey::Int(-i128::from(r.metadata.pixel_count)),
        LowerPixelCount => |r| SortKey::Int(i128::from(r.metadata.pixel_count)),
        MoreExifData => |r| SortKey::Int(-i128::from(r.metadata.exif_tag_count)),
        LessExifData => |r| SortKey::Int(i128::from(r.metadata.exif_tag_count)),
        BiggerFileSize => |r| SortKey::Int(-i128::from(r.metadata.file_size)),
        SmallerFileSize => |r| SortKey::Int(i128::from(r.metadata.file_size)),
        NewerModificationDate => |r| SortKey::Int(-mtime(r)),
        OlderModificationDate => |r| SortKey::Int(mtime(r)),
        SmallerDistance => |r| SortKey::Float(r.distance),
        BiggerDistance => |r| SortKey::Float(-r.distance),
        ContainsCopyInFilename => |r| SortKey::Int(i128::from(!contains_copy(r))),
        DoesntContainCopyInFilename => |r| SortKey::Int(i128::from(contains_copy(r))),
        LongerFilename => |r| SortKey::Int(-(r.file_name().chars().count() as i128)),
        ShorterFilename => |r| SortKey::Int(r.file_name().chars().count() as i128),
        LongerFolderPath => |r| SortKey::Int(-(r.folder().chars().count() as i128)),
        ShorterFolderPath => |r| SortKey::Int(r.folder().chars().count() as i128),
        HigherScore => |r| SortKey::Float(-r.score),
        LowerScore => |r| SortKey::Float(r.score),
    }
}

/// The key `rule` assigns to `record`.
pub fn key_for(rule: PrioritizationRule, record: &FileRecord) -> SortKey {
    registry(rule)(record)
}

/// Orders duplicate groups by a fixed list of rules.
///
/// Rules are resolved to key functions once, at construction.
#[derive(Clone)]
pub struct Ranker {
    rules: Vec<PrioritizationRule>,
    keys: Vec<KeyFn>,
}

impl std::fmt::Debug for Ranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ranker").field("rules", &self.rules).finish()
    }
}

impl Ranker {
    /// Create a ranker for the given rule order.
    pub fn new(rules: &[PrioritizationRule]) -> Self {
        Self {
            rules: rules.to_vec(),
            keys: rules.iter().map(|r| registry(*r)).collect(),
        }
    }

    /// The configured rule order.
    pub fn rules(&self) -> &[PrioritizationRule] {
        &self.rules
    }

    /// Composite key for one record.
    pub fn composite_key(&self, record: &FileRecord) -> (Vec<SortKey>, String) {
        (
            self.keys.iter().map(|key| key(record)).collect(),
            record.path.to_string_lossy().into_owned(),
        )
    }

    /// Sort `records` so that index 0 is the most preferred copy.
    pub fn rank(&self, mut records: Vec<FileRecord>) -> Result<Vec<FileRecord>, RankError> {
        if records.is_empty() {
            return Err(RankError::EmptyGroup);
        }
        records.sort_by_cached_key(|r| self.composite_key(r));
        Ok(records)
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(&PrioritizationRule::defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use imagededup_core::FileMetadata;

    fn record(path: &str) -> FileRecord {
        FileRecord::new(
            path,
            FileMetadata::new(100, Utc.timestamp_opt(1_000_000, 0).unwrap()),
        )
    }

    #[test]
    fn test_sort_key_ordering() {
        assert!(SortKey::Int(-5) < SortKey::Int(3));
        assert!(SortKey::Float(0.1) < SortKey::Float(0.2));
        assert!(SortKey::Text("a".into()) < SortKey::Text("b".into()));
        assert_eq!(SortKey::Float(f64::NAN), SortKey::Float(f64::NAN));
    }

    #[test]
    fn test_every_rule_has_a_key() {
        let r = record("/photos/a.jpg");
        for name in PrioritizationRule::names() {
            let rule = PrioritizationRule::parse(&name).unwrap();
            let _ = key_for(rule, &r);
        }
    }

    #[test]
    fn test_copy_detection_is_case_insensitive() {
        let plain = record("/p/1.jpg");
        let copy = record("/p/1 - COPY.jpg");
        let rule = PrioritizationRule::DoesntContainCopyInFilename;
        assert!(key_for(rule, &plain) < key_for(rule, &copy));
    }

    #[test]
    fn test_path_is_final_tie_breaker() {
        let ranker = Ranker::default();
        let ranked = ranker
            .rank(vec![record("/p/b.jpg"), record("/p/a.jpg")])
            .unwrap();
        assert_eq!(ranked[0].path.to_string_lossy(), "/p/a.jpg");
    }

    #[test]
    fn test_empty_group_rejected() {
        assert_eq!(Ranker::default().rank(vec![]), Err(RankError::EmptyGroup));
    }
}
