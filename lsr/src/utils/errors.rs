//! Error types for lsr.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LsrError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Traversal error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Corrupt manifest at line {line}: {reason}")]
    ManifestCorrupt { line: usize, reason: String },

    #[error("Scan order violated: {current:?} does not sort after {previous:?}")]
    OutOfOrder { previous: String, current: String },

    #[error("Path is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),
}

impl LsrError {
    /// Wrap an I/O error with the path it happened on.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LsrError::File {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(line: usize, reason: impl Into<String>) -> Self {
        LsrError::ManifestCorrupt {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LsrError>;
