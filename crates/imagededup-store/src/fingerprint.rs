//! Signature extraction and comparison.

use std::fs::File;
use std::path::Path;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use imagededup_core::StoreError;

/// An opaque signature plus the image facts extracted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Backend-specific signature, hex encoded.
    pub signature: String,
    /// Width * height, 0 if the backend does not decode images.
    pub pixel_count: u64,
    /// Number of EXIF tags, 0 if not extracted.
    pub exif_tag_count: u32,
}

/// Turns files into signatures and measures the distance between them.
pub trait Fingerprinter: Send + Sync {
    /// Compute the fingerprint of the file at `path`.
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, StoreError>;

    /// Distance in `[0, 1]`; 0 means identical.
    fn distance(&self, a: &Fingerprint, b: &Fingerprint) -> f64;
}

/// Exact-content fingerprinter based on a BLAKE3 hash.
///
/// Distance is 0 for byte-identical files and 1 otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentFingerprinter;

impl Fingerprinter for ContentFingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, StoreError> {
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        let mut hasher = Hasher::new();
        hasher
            .update_reader(file)
            .map_err(|e| StoreError::io(path, e))?;

        Ok(Fingerprint {
            signature: hasher.finalize().to_hex().to_string(),
            pixel_count: 0,
            exif_tag_count: 0,
        })
    }

    fn distance(&self, a: &Fingerprint, b: &Fingerprint) -> f64 {
        if a.signature == b.signature { 0.0 } else { 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_content_fingerprint_distance() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        let c = temp.path().join("c.jpg");
        fs::write(&a, "same").unwrap();
        fs::write(&b, "same").unwrap();
        fs::write(&c, "other").unwrap();

        let fp = ContentFingerprinter;
        let (fa, fb, fc) = (
            fp.fingerprint(&a).unwrap(),
            fp.fingerprint(&b).unwrap(),
            fp.fingerprint(&c).unwrap(),
        );
        assert_eq!(fp.distance(&fa, &fb), 0.0);
        assert_eq!(fp.distance(&fa, &fc), 1.0);
        assert_eq!(fa.signature.len(), 64);
    }

    #[test]
    fn test_signature_covers_whole_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.jpg");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        let fingerprint = ContentFingerprinter.fingerprint(&path).unwrap();
        assert_eq!(fingerprint.signature, blake3::hash(&content).to_hex().to_string());
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = ContentFingerprinter
            .fingerprint(&temp.path().join("gone.jpg"))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
