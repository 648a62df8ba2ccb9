//! The signature store seam.

use std::path::Path;

use crate::error::StoreError;
use crate::record::FileRecord;

/// Iterator over every persisted record.
pub type RecordIter<'a> = Box<dyn Iterator<Item = FileRecord> + Send + 'a>;

/// Persistence and similarity search for image signatures.
///
/// The similarity metric and the index layout are owned by the
/// implementation. Every call may block on I/O or a network round trip.
pub trait SignatureStore: Send + Sync {
    /// Analyze `path` and persist its record.
    ///
    /// Returns `Ok(false)` without writing when a record with the same
    /// size, modification time and data model version already exists.
    fn add(&self, path: &Path) -> Result<bool, StoreError>;

    /// Records similar to `path`, ordered by ascending distance.
    ///
    /// The reference itself is part of the result when it is indexed.
    fn find_similar(&self, path: &Path) -> Result<Vec<FileRecord>, StoreError>;

    /// Total record count plus an iterator over all records.
    fn get_all(&self) -> Result<(usize, RecordIter<'_>), StoreError>;

    /// Remove every record for `path`. Removing an unknown path is a no-op.
    fn remove(&self, path: &Path) -> Result<(), StoreError>;
}

impl<T: SignatureStore + ?Sized> SignatureStore for std::sync::Arc<T> {
    fn add(&self, path: &Path) -> Result<bool, StoreError> {
        (**self).add(path)
    }

    fn find_similar(&self, path: &Path) -> Result<Vec<FileRecord>, StoreError> {
        (**self).find_similar(path)
    }

    fn get_all(&self) -> Result<(usize, RecordIter<'_>), StoreError> {
        (**self).get_all()
    }

    fn remove(&self, path: &Path) -> Result<(), StoreError> {
        (**self).remove(path)
    }
}
