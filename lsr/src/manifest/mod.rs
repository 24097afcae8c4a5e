//! Manifest records and their on-disk representation.
//!
//! A manifest is one line per regular file, ordered by [`order::compare_paths`],
//! recording the file's size, modification time and SHA-256 digest.

pub mod codec;
pub mod order;
pub mod reader;
pub mod writer;

use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

pub use order::compare_paths;
pub use reader::ManifestReader;
pub use writer::ManifestWriter;

/// Default manifest file name in the scanned root.
pub const DEFAULT_MANIFEST_NAME: &str = ".lsr";

/// Length in bytes of a SHA-256 digest.
pub const DIGEST_LEN: usize = 32;

/// Largest mtime difference still treated as "the same time".
///
/// Persisted timestamps are truncated to whole seconds, so two readings of
/// the same instant can land one second apart.
pub const MTIME_TOLERANCE: Duration = Duration::seconds(1);

pub type Digest = [u8; DIGEST_LEN];

/// One manifest line: the observed state of a regular file at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Path relative to the scanned root, `/`-separated raw bytes
    pub path: Vec<u8>,

    /// File size in bytes
    pub size: u64,

    /// Last modified time, whole seconds
    pub mtime: DateTime<Utc>,

    /// SHA-256 of the file contents
    pub digest: Digest,
}

impl Record {
    /// Same size and digest, i.e. the bytes did not change.
    pub fn same_content(&self, other: &Record) -> bool {
        self.size == other.size && self.digest == other.digest
    }
}

/// Compare two mtimes, treating differences within [`MTIME_TOLERANCE`] as equal.
pub fn compare_mtime(a: DateTime<Utc>, b: DateTime<Utc>) -> Ordering {
    let delta = b.signed_duration_since(a);
    if delta.abs() <= MTIME_TOLERANCE {
        Ordering::Equal
    } else if delta > Duration::zero() {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}
