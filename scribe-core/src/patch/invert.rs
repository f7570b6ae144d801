//! Patch inversion
//!
//! `invert(before, p)` derives the reverse patch: applied to the state
//! after `p`, it restores the state before `p`. Each operation is
//! inverted against the state at its own application point, then the
//! undo sequences are emitted in reverse order.

use serde_json::Value;

use super::apply::{apply_op, get_path};
use super::{Patch, PatchOp};

fn invert_op(state: &Value, op: &PatchOp) -> Vec<PatchOp> {
    match op {
        PatchOp::Update { path, .. } | PatchOp::Replace { path, .. } => {
            match get_path(state, path) {
                Some(old) => vec![PatchOp::Update {
                    path: path.clone(),
                    value: old.clone(),
                }],
                None => vec![PatchOp::Delete { path: path.clone() }],
            }
        }
        PatchOp::Delete { path } => match get_path(state, path) {
            Some(old) => vec![PatchOp::Update {
                path: path.clone(),
                value: old.clone(),
            }],
            None => Vec::new(),
        },
        PatchOp::Add { path, value } => match get_path(state, path) {
            Some(Value::Array(_)) => vec![PatchOp::Remove {
                path: path.clone(),
                value: Some(value.clone()),
            }],
            Some(old) => vec![PatchOp::Update {
                path: path.clone(),
                value: old.clone(),
            }],
            None => vec![PatchOp::Delete { path: path.clone() }],
        },
        PatchOp::Remove { path, value } => match get_path(state, path) {
            Some(Value::Array(items)) => match value {
                Some(needle) if items.contains(needle) => vec![PatchOp::Add {
                    path: path.clone(),
                    value: needle.clone(),
                }],
                Some(_) => Vec::new(),
                None => vec![PatchOp::Update {
                    path: path.clone(),
                    value: Value::Array(items.clone()),
                }],
            },
            Some(old) => vec![PatchOp::Update {
                path: path.clone(),
                value: old.clone(),
            }],
            None => Vec::new(),
        },
        PatchOp::Test { .. } => Vec::new(),
        PatchOp::Move { from, path } => {
            if get_path(state, from).is_none() {
                return Vec::new();
            }
            let mut undo = vec![PatchOp::Move {
                from: path.clone(),
                path: from.clone(),
            }];
            if let Some(overwritten) = get_path(state, path) {
                undo.push(PatchOp::Update {
                    path: path.clone(),
                    value: overwritten.clone(),
                });
            }
            undo
        }
        PatchOp::Copy { from, path } => {
            if get_path(state, from).is_none() {
                return Vec::new();
            }
            match get_path(state, path) {
                Some(old) => vec![PatchOp::Update {
                    path: path.clone(),
                    value: old.clone(),
                }],
                None => vec![PatchOp::Delete { path: path.clone() }],
            }
        }
    }
}

/// Compute the patch that undoes `patch` against the pre-state `before`.
pub fn invert(before: &Value, patch: &Patch) -> Patch {
    let mut state = before.clone();
    let mut undos: Vec<Vec<PatchOp>> = Vec::with_capacity(patch.len());
    for op in patch.ops() {
        undos.push(invert_op(&state, op));
        state = apply_op(&state, op);
    }
    undos.into_iter().rev().flatten().collect()
}
