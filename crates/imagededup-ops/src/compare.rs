//! Byte-level content comparison for move collisions.

use std::fs::File;
use std::io;
use std::path::Path;

use blake3::Hasher;

/// BLAKE3 hash of a file's full content.
pub fn content_hash(path: &Path) -> io::Result<blake3::Hash> {
    let mut hasher = Hasher::new();
    hasher.update_reader(File::open(path)?)?;
    Ok(hasher.finalize())
}

/// Whether two files hold identical bytes.
pub fn same_content(a: &Path, b: &Path) -> io::Result<bool> {
    if std::fs::metadata(a)?.len() != std::fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(content_hash(a)? == content_hash(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_same_content() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        let c = temp.path().join("c.jpg");
        let d = temp.path().join("d.jpg");
        fs::write(&a, "pixels").unwrap();
        fs::write(&b, "pixels").unwrap();
        fs::write(&c, "PIXELS").unwrap();
        fs::write(&d, "more pixels").unwrap();

        assert!(same_content(&a, &b).unwrap());
        assert!(!same_content(&a, &c).unwrap());
        assert!(!same_content(&a, &d).unwrap());
    }

    #[test]
    fn test_content_hash_matches_in_memory_hash() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.jpg");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        assert_eq!(content_hash(&path).unwrap(), blake3::hash(&content));
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        fs::write(&a, "x").unwrap();
        assert!(same_content(&a, &temp.path().join("missing.jpg")).is_err());
    }
}
