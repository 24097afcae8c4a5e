//! File metadata as recorded in a manifest.

use chrono::{DateTime, SubsecRound, Utc};
use std::fs;
use std::path::Path;

/// Size and modification time of a regular file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,

    /// Last modified time, truncated to whole seconds
    pub modified: DateTime<Utc>,
}

impl FileMetadata {
    /// Extract metadata from a file path, following symlinks
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        Self::from_metadata(&fs::metadata(path)?)
    }

    pub fn from_metadata(metadata: &fs::Metadata) -> std::io::Result<Self> {
        let modified = DateTime::<Utc>::from(metadata.modified()?).trunc_subsecs(0);

        Ok(Self {
            size: metadata.len(),
            modified,
        })
    }
}
