//! Filesystem side of a scan: traversal, metadata and content hashing.

pub mod hasher;
pub mod metadata;
pub mod walker;
