//! Overlap detection
//!
//! Two patches overlap when their forward edits mutate a shared path.
//! Paths are shared when equal or when one addresses an ancestor of the
//! other: mutating `/a` disturbs everything under it. `test` operations
//! do not mutate and never contribute to overlap.

use super::{Patch, Path};

/// True when `a` and `b` address the same node or one contains the other.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    a.is_prefix_of(b) || b.is_prefix_of(a)
}

/// True when the two patches mutate any shared path.
pub fn overlap(first: &Patch, second: &Patch) -> bool {
    let left = first.target_paths();
    let right = second.target_paths();
    left.iter().any(|a| right.iter().any(|b| paths_overlap(a, b)))
}
