//! Depth-first directory traversal in manifest order.
//!
//! Entries are produced lazily, directories before their contents and
//! siblings sorted by file name, which is exactly the order defined by
//! [`crate::manifest::compare_paths`]. Only regular files are reported.

use super::metadata::FileMetadata;
use crate::manifest::codec::display_path;
use crate::utils::errors::{LsrError, Result};
use chrono::{DateTime, Utc};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Follow symbolic links
    pub follow_links: bool,

    /// File names ignored directly under the root (the manifest itself)
    pub exclude_root_names: Vec<String>,

    /// Report unreadable entries as skipped instead of failing
    pub skip_errors: bool,
}

/// A regular file discovered during walking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root, `/`-separated raw bytes
    pub relative_path: Vec<u8>,

    /// File size in bytes
    pub size: u64,

    /// Last modified time, whole seconds
    pub mtime: DateTime<Utc>,
}

/// One step of the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkItem {
    File(FileInfo),

    /// An entry that could not be read. Everything at or below `relative_path`
    /// is unknown for this run.
    Skipped {
        relative_path: Vec<u8>,
        reason: String,
    },
}

/// Lazy walk over `root`.
pub struct Walker {
    root: PathBuf,
    options: WalkOptions,
    inner: walkdir::IntoIter,
}

impl Walker {
    pub fn new(root: &Path, options: WalkOptions) -> Self {
        let inner = WalkDir::new(root)
            .follow_links(options.follow_links)
            .sort_by_file_name()
            .into_iter();

        Self {
            root: root.to_path_buf(),
            options,
            inner,
        }
    }

    fn visit(&mut self, entry: DirEntry) -> Result<Option<FileInfo>> {
        if entry.depth() == 1 {
            let name = entry.file_name().to_string_lossy();
            if self.options.exclude_root_names.iter().any(|n| *n == name) {
                if entry.file_type().is_dir() {
                    self.inner.skip_current_dir();
                }
                return Ok(None);
            }
        }

        if !entry.file_type().is_file() {
            return Ok(None);
        }

        let metadata = entry.metadata()?;
        let meta = FileMetadata::from_metadata(&metadata)
            .map_err(|e| LsrError::file(entry.path(), e))?;

        Ok(Some(FileInfo {
            relative_path: self.relative(entry.path())?,
            path: entry.into_path(),
            size: meta.size,
            mtime: meta.modified,
        }))
    }

    /// `/`-joined path relative to the root.
    fn relative(&self, path: &Path) -> Result<Vec<u8>> {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let mut out = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => {
                    if !out.is_empty() {
                        out.push(b'/');
                    }
                    out.extend_from_slice(name_bytes(part, path)?);
                }
                Component::CurDir => {}
                _ => return Err(LsrError::InvalidPath(path.to_path_buf())),
            }
        }
        Ok(out)
    }

    /// Apply the error policy to a failure at `path`.
    fn skip_or_fail(&self, path: Option<&Path>, depth: usize, err: LsrError) -> Result<WalkItem> {
        let path = match path {
            Some(path) if self.options.skip_errors && depth > 0 => path,
            _ => return Err(err),
        };
        let relative_path = match self.relative(path) {
            Ok(rel) if !rel.is_empty() => rel,
            _ => return Err(err),
        };

        warn!(
            "Skipping unreadable entry {}: {}",
            display_path(&relative_path),
            err
        );
        Ok(WalkItem::Skipped {
            relative_path,
            reason: err.to_string(),
        })
    }
}

/// File names are arbitrary bytes on unix.
#[cfg(unix)]
fn name_bytes<'a>(name: &'a OsStr, _full: &Path) -> Result<&'a [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Ok(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes<'a>(name: &'a OsStr, full: &Path) -> Result<&'a [u8]> {
    name.to_str()
        .map(str::as_bytes)
        .ok_or_else(|| LsrError::InvalidPath(full.to_path_buf()))
}

impl Iterator for Walker {
    type Item = Result<WalkItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf);
                    let depth = err.depth();
                    return Some(self.skip_or_fail(path.as_deref(), depth, err.into()));
                }
            };

            let path = entry.path().to_path_buf();
            let depth = entry.depth();
            match self.visit(entry) {
                Ok(Some(file)) => return Some(Ok(WalkItem::File(file))),
                Ok(None) => continue,
                Err(err) => return Some(self.skip_or_fail(Some(&path), depth, err)),
            }
        }
    }
}
