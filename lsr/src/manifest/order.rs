//! Traversal-consistent ordering of manifest paths.
//!
//! A depth-first walk with siblings sorted by name visits everything under
//! `a/` before `a-b` or `a.txt`, while plain string ordering puts `-` and `.`
//! ahead of `/`. Both the stored manifest and the live walk follow this order.

use std::cmp::Ordering;

/// Compare two relative paths in traversal order.
///
/// At the first differing byte a `/` sorts before anything else; otherwise
/// bytes compare by value. A proper prefix sorts first.
pub fn compare_paths(a: impl AsRef<[u8]>, b: impl AsRef<[u8]>) -> Ordering {
    let (a, b) = (a.as_ref(), b.as_ref());
    for (x, y) in a.iter().zip(b) {
        if x != y {
            return match (*x, *y) {
                (b'/', _) => Ordering::Less,
                (_, b'/') => Ordering::Greater,
                _ => x.cmp(y),
            };
        }
    }
    a.len().cmp(&b.len())
}

/// `path` is `dir` itself or lies somewhere below it.
pub fn is_within(path: &[u8], dir: &[u8]) -> bool {
    path.strip_prefix(dir)
        .map(|rest| rest.is_empty() || rest.starts_with(b"/"))
        .unwrap_or(false)
}
