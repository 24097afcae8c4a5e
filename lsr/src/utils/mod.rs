//! Utility modules for lsr.

pub mod errors;
pub mod logger;

pub use errors::{LsrError, Result};
