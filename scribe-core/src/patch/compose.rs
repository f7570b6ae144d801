//! Forward composition of patches
//!
//! `compose(p1, p2)` is the single patch equivalent to applying `p1`
//! then `p2`. Operations are concatenated; an earlier operation is
//! compacted away when a later force-set at the identical path makes it
//! unobservable. Two guards keep compaction sound:
//!
//! - it never crosses prefix boundaries: an op on `/a/b` creates `/a` as
//!   a side effect, so only an exact-path force-set (which recreates the
//!   same containers) may shadow it;
//! - an op stays when a retained `move`/`copy` after it reads the target
//!   path, since that read feeds an effect outside the overwritten node.

use super::overlap::paths_overlap;
use super::{Patch, PatchOp, Path};

fn shadows(later: &PatchOp, earlier: &PatchOp) -> bool {
    let target: &Path = match later {
        PatchOp::Update { path, .. } | PatchOp::Replace { path, .. } => path,
        // A delete only shadows a previous delete of the same node; any
        // other earlier op may have created containers a bare delete
        // would not recreate.
        PatchOp::Delete { path } => {
            return matches!(earlier, PatchOp::Delete { path: previous } if previous == path)
        }
        _ => return false,
    };
    let mutated = earlier.mutated_paths();
    mutated.len() == 1 && mutated[0] == target
}

fn reads_from(op: &PatchOp, target: &Path) -> bool {
    match op {
        PatchOp::Move { from, .. } | PatchOp::Copy { from, .. } => paths_overlap(from, target),
        _ => false,
    }
}

fn compact(ops: Vec<PatchOp>, later: &PatchOp, target: &Path) -> Vec<PatchOp> {
    let mut kept = Vec::with_capacity(ops.len());
    // Walk tail-first: once a retained op reads the target, everything
    // before it must survive.
    let mut pinned = false;
    for earlier in ops.into_iter().rev() {
        if !pinned && shadows(later, &earlier) {
            continue;
        }
        if reads_from(&earlier, target) {
            pinned = true;
        }
        kept.push(earlier);
    }
    kept.reverse();
    kept
}

/// Compose two patches: apply `first`, then `second`.
pub fn compose(first: &Patch, second: &Patch) -> Patch {
    let mut ops: Vec<PatchOp> = first.ops().to_vec();
    for op in second.ops() {
        let target = match op {
            PatchOp::Update { path, .. }
            | PatchOp::Replace { path, .. }
            | PatchOp::Delete { path } => Some(path.clone()),
            _ => None,
        };
        if let Some(target) = target {
            ops = compact(ops, op, &target);
        }
        ops.push(op.clone());
    }
    Patch::from_ops(ops)
}
