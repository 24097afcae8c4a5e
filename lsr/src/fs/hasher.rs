//! Content hashing.
//!
//! Files are streamed through SHA-256 in fixed-size chunks. In trust mode a
//! previous digest is reused when size and mtime look unchanged, which skips
//! the read but can no longer catch silent corruption.

use super::walker::FileInfo;
use crate::manifest::codec::display_path;
use crate::manifest::{compare_mtime, Digest, Record};
use crate::utils::errors::{LsrError, Result};
use sha2::{Digest as _, Sha256};
use std::cmp::Ordering;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::trace;

/// Produces the digest for a file visited by the scan.
///
/// `previous` is the record for the same path from the last run, if any.
pub trait Digester {
    fn digest(&mut self, file: &FileInfo, previous: Option<&Record>) -> Result<Digest>;
}

/// Stream a file through SHA-256.
pub fn hash_file(path: &Path) -> Result<Digest> {
    let mut file = File::open(path).map_err(|e| LsrError::file(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| LsrError::file(path, e))?;
    Ok(hasher.finalize().into())
}

/// Hashes file contents, optionally trusting unchanged metadata.
#[derive(Debug, Default)]
pub struct ContentHasher {
    trust: bool,
    hashed: usize,
    reused: usize,
}

impl ContentHasher {
    pub fn new(trust: bool) -> Self {
        Self {
            trust,
            ..Self::default()
        }
    }

    /// Files whose contents were read.
    pub fn hashed(&self) -> usize {
        self.hashed
    }

    /// Files whose previous digest was reused.
    pub fn reused(&self) -> usize {
        self.reused
    }
}

impl Digester for ContentHasher {
    fn digest(&mut self, file: &FileInfo, previous: Option<&Record>) -> Result<Digest> {
        if self.trust {
            if let Some(prev) = previous.filter(|p| {
                p.size == file.size && compare_mtime(p.mtime, file.mtime) == Ordering::Equal
            }) {
                trace!("Reusing digest for {}", display_path(&file.relative_path));
                self.reused += 1;
                return Ok(prev.digest);
            }
        }

        trace!("Hashing {}", display_path(&file.relative_path));
        self.hashed += 1;
        hash_file(&file.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::metadata::FileMetadata;
    use std::fs;
    use tempfile::TempDir;

    // sha256("hello world")
    const HELLO: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn file_info(dir: &TempDir, name: &str) -> FileInfo {
        let path = dir.path().join(name);
        let meta = FileMetadata::from_path(&path).unwrap();
        FileInfo {
            path,
            relative_path: name.as_bytes().to_vec(),
            size: meta.size,
            mtime: meta.modified,
        }
    }

    #[test]
    fn test_hash_file() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("f"), b"hello world")?;
        assert_eq!(hex::encode(hash_file(&dir.path().join("f"))?), HELLO);
        Ok(())
    }

    #[test]
    fn test_hash_large_file() -> Result<()> {
        let dir = TempDir::new()?;
        let data = vec![0x5au8; 3 * 1024 * 1024 + 17];
        fs::write(dir.path().join("big"), &data)?;

        let expected: Digest = Sha256::digest(&data).into();
        assert_eq!(hash_file(&dir.path().join("big"))?, expected);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = hash_file(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, LsrError::File { .. }));
    }

    #[test]
    fn test_trust_mode_reuses_digest() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("f"), b"hello world")?;
        let file = file_info(&dir, "f");

        let previous = Record {
            path: b"f".to_vec(),
            size: file.size,
            mtime: file.mtime,
            digest: [9; 32],
        };

        let mut trusting = ContentHasher::new(true);
        assert_eq!(trusting.digest(&file, Some(&previous))?, [9; 32]);
        assert_eq!((trusting.hashed(), trusting.reused()), (0, 1));

        let mut strict = ContentHasher::new(false);
        assert_eq!(hex::encode(strict.digest(&file, Some(&previous))?), HELLO);
        assert_eq!((strict.hashed(), strict.reused()), (1, 0));
        Ok(())
    }

    #[test]
    fn test_trust_mode_rehashes_on_metadata_change() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("f"), b"hello world")?;
        let file = file_info(&dir, "f");

        let mut trusting = ContentHasher::new(true);

        let resized = Record {
            path: b"f".to_vec(),
            size: file.size + 1,
            mtime: file.mtime,
            digest: [9; 32],
        };
        assert_eq!(hex::encode(trusting.digest(&file, Some(&resized))?), HELLO);

        let older = Record {
            size: file.size,
            mtime: file.mtime - chrono::Duration::seconds(5),
            ..resized
        };
        assert_eq!(hex::encode(trusting.digest(&file, Some(&older))?), HELLO);

        assert_eq!(hex::encode(trusting.digest(&file, None)?), HELLO);
        assert_eq!(trusting.hashed(), 3);
        Ok(())
    }
}
