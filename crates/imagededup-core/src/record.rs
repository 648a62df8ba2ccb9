//! File records and per-path actions.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Schema version written into every persisted record.
///
/// Records carrying any other version are dropped by the stale-index
/// cleanup phase.
pub const DATA_MODEL_VERSION: u32 = 2;

/// Metadata persisted alongside a signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// File size in bytes.
    pub file_size: u64,
    /// Last modification time.
    pub modification_time: DateTime<Utc>,
    /// Width * height of the decoded image (0 if unknown).
    pub pixel_count: u64,
    /// Number of EXIF tags found in the file.
    pub exif_tag_count: u32,
    /// Schema version the record was written with.
    pub data_model_version: u32,
}

impl FileMetadata {
    /// Create metadata for the current data model version.
    pub fn new(file_size: u64, modification_time: DateTime<Utc>) -> Self {
        Self {
            file_size,
            modification_time,
            pixel_count: 0,
            exif_tag_count: 0,
            data_model_version: DATA_MODEL_VERSION,
        }
    }

    /// Set the pixel count.
    pub fn with_pixel_count(mut self, pixel_count: u64) -> Self {
        self.pixel_count = pixel_count;
        self
    }

    /// Set the EXIF tag count.
    pub fn with_exif_tag_count(mut self, exif_tag_count: u32) -> Self {
        self.exif_tag_count = exif_tag_count;
        self
    }

    /// Whether the record was written with the current schema.
    pub fn is_current_version(&self) -> bool {
        self.data_model_version == DATA_MODEL_VERSION
    }
}

/// A store record as returned by a similarity query.
///
/// Records are produced per query and are not owned long-term by the
/// pipeline; `distance` and `score` are relative to the query reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Similarity distance to the reference, in `[0, 1]`.
    pub distance: f64,
    /// Backend-specific match score (higher is a better match).
    pub score: f64,
    /// Persisted metadata.
    pub metadata: FileMetadata,
}

impl FileRecord {
    /// Create a record with zero distance and score.
    pub fn new(path: impl Into<PathBuf>, metadata: FileMetadata) -> Self {
        Self {
            path: path.into(),
            distance: 0.0,
            score: 0.0,
            metadata,
        }
    }

    /// Set distance and score relative to a reference.
    pub fn with_match(mut self, distance: f64, score: f64) -> Self {
        self.distance = distance;
        self.score = score;
        self
    }

    /// File name component as a lossy string.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Containing folder as a lossy string.
    pub fn folder(&self) -> String {
        self.path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether this record lies inside `root` (strictly below it).
    pub fn is_under(&self, root: &Path) -> bool {
        self.path != root && self.path.starts_with(root)
    }
}

/// The action assigned to a path during a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Keep the file untouched.
    None,
    /// Move the file below the duplicates target directory.
    Move,
    /// Delete the file.
    Delete,
}

impl Action {
    /// Whether this action takes the file away from its folder.
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Move | Self::Delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> FileRecord {
        FileRecord::new(path, FileMetadata::new(100, DateTime::<Utc>::UNIX_EPOCH))
    }

    #[test]
    fn test_record_name_and_folder() {
        let r = record("/photos/2020/img-copy.jpg");
        assert_eq!(r.file_name(), "img-copy.jpg");
        assert_eq!(r.folder(), "/photos/2020");
    }

    #[test]
    fn test_record_is_under() {
        let r = record("/photos/2020/img.jpg");
        assert!(r.is_under(Path::new("/photos")));
        assert!(!r.is_under(Path::new("/pictures")));
        assert!(!r.is_under(Path::new("/photos/2020/img.jpg")));
    }

    #[test]
    fn test_action_display_and_removal() {
        assert_eq!(Action::Delete.to_string(), "delete");
        assert!(Action::Move.is_removal());
        assert!(!Action::None.is_removal());
    }

    #[test]
    fn test_metadata_version() {
        let mut meta = FileMetadata::new(1, Utc::now());
        assert!(meta.is_current_version());
        meta.data_model_version = 1;
        assert!(!meta.is_current_version());
    }
}
