//! lsr library
//!
//! Content-addressed listing of a directory tree, compared against the
//! listing from the previous run to report new, deleted, modified, reverted,
//! touched and silently corrupted files.

pub mod config;
pub mod executor;
pub mod fs;
pub mod manifest;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::report::{Classification, ScanSummary};
pub use executor::{ScanExecutor, ScanJob, ScanMode};
pub use utils::errors::{LsrError, Result};
