//! DashMap-backed signature store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use imagededup_core::{FileMetadata, FileRecord, RecordIter, SignatureStore, StoreError};

use crate::fingerprint::{Fingerprint, Fingerprinter};

/// Default similarity cutoff for [`MemoryStore::find_similar`].
const DEFAULT_MAX_DISTANCE: f64 = 0.10;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    metadata: FileMetadata,
    fingerprint: Fingerprint,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    path: PathBuf,
    #[serde(flatten)]
    record: StoredRecord,
}

/// In-process [`SignatureStore`].
pub struct MemoryStore {
    records: DashMap<PathBuf, StoredRecord>,
    fingerprinter: Box<dyn Fingerprinter>,
    max_distance: f64,
    snapshot: Option<PathBuf>,
    writes: AtomicU64,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.records.len())
            .field("max_distance", &self.max_distance)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store without persistence.
    pub fn new(fingerprinter: impl Fingerprinter + 'static) -> Self {
        Self {
            records: DashMap::new(),
            fingerprinter: Box::new(fingerprinter),
            max_distance: DEFAULT_MAX_DISTANCE,
            snapshot: None,
            writes: AtomicU64::new(0),
        }
    }

    /// Open a store backed by the JSON snapshot at `path`.
    ///
    /// A missing snapshot yields an empty store that [`save`](Self::save)
    /// will create.
    pub fn open(
        path: impl Into<PathBuf>,
        fingerprinter: impl Fingerprinter + 'static,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let mut store = Self::new(fingerprinter);

        match fs::read(&path) {
            Ok(bytes) => {
                let entries: Vec<SnapshotEntry> = serde_json::from_slice(&bytes).map_err(|e| {
                    StoreError::backend(format!("invalid snapshot {}: {}", path.display(), e))
                })?;
                for entry in entries {
                    store.records.insert(entry.path, entry.record);
                }
                info!(
                    "Loaded {} records from {}",
                    store.records.len(),
                    path.display()
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {}, starting empty", path.display());
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        }

        store.snapshot = Some(path);
        Ok(store)
    }

    /// Set the similarity cutoff.
    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Write the snapshot, if the store was opened from one.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let mut entries: Vec<SnapshotEntry> = self
            .records
            .iter()
            .map(|r| SnapshotEntry {
                path: r.key().clone(),
                record: r.value().clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let bytes = serde_json::to_vec(&entries)
            .map_err(|e| StoreError::backend(format!("cannot encode snapshot: {e}")))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;

        info!("Saved {} records to {}", entries.len(), path.display());
        Ok(())
    }

    /// Insert a record directly, bypassing fingerprinting and idempotence.
    pub fn insert(&self, path: impl Into<PathBuf>, metadata: FileMetadata, fingerprint: Fingerprint) {
        self.records.insert(
            path.into(),
            StoredRecord {
                metadata,
                fingerprint,
            },
        );
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of records written since creation.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record exists for `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    fn reference_fingerprint(&self, path: &Path) -> Result<Fingerprint, StoreError> {
        if let Some(existing) = self.records.get(path) {
            return Ok(existing.fingerprint.clone());
        }
        self.fingerprinter.fingerprint(path)
    }
}

impl SignatureStore for MemoryStore {
    fn add(&self, path: &Path) -> Result<bool, StoreError> {
        let meta = fs::metadata(path).map_err(|e| StoreError::io(path, e))?;
        let modified = meta.modified().map_err(|e| StoreError::io(path, e))?;
        let modification_time: DateTime<Utc> = modified.into();
        let file_size = meta.len();

        if let Some(existing) = self.records.get(path) {
            let m = &existing.metadata;
            if m.file_size == file_size
                && m.modification_time == modification_time
                && m.is_current_version()
            {
                debug!("Skipping unchanged {}", path.display());
                return Ok(false);
            }
        }

        let fingerprint = self.fingerprinter.fingerprint(path)?;
        let metadata = FileMetadata::new(file_size, modification_time)
            .with_pixel_count(fingerprint.pixel_count)
            .with_exif_tag_count(fingerprint.exif_tag_count);

        self.insert(path, metadata, fingerprint);
        debug!("Stored {}", path.display());
        Ok(true)
    }

    fn find_similar(&self, path: &Path) -> Result<Vec<FileRecord>, StoreError> {
        let reference = self.reference_fingerprint(path)?;

        let mut matches: Vec<FileRecord> = self
            .records
            .iter()
            .filter_map(|entry| {
                let distance = self
                    .fingerprinter
                    .distance(&reference, &entry.value().fingerprint);
                (distance <= self.max_distance).then(|| {
                    FileRecord::new(entry.key().clone(), entry.value().metadata.clone())
                        .with_match(distance, ((1.0 - distance) * 100.0).round())
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(matches)
    }

    fn get_all(&self) -> Result<(usize, RecordIter<'_>), StoreError> {
        // Collected up front so callers may remove while iterating.
        let records: Vec<FileRecord> = self
            .records
            .iter()
            .map(|entry| FileRecord::new(entry.key().clone(), entry.value().metadata.clone()))
            .collect();
        Ok((records.len(), Box::new(records.into_iter())))
    }

    fn remove(&self, path: &Path) -> Result<(), StoreError> {
        if self.records.remove(path).is_some() {
            debug!("Removed {} from store", path.display());
        }
        Ok(())
    }
}
