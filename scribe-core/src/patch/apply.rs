//! Patch application
//!
//! Folds patch operations into a JSON document state. Application is
//! total: missing paths are tolerated per operation kind, so replaying a
//! chain never fails halfway through.

use serde_json::{Map, Value};

use super::{Patch, PatchOp, Path, Segment};
use crate::types::Commit;

/// Read the node addressed by `path`, if present.
pub(crate) fn get_path<'a>(value: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.segments() {
        current = match (current, segment) {
            (Value::Object(map), Segment::Key(key)) => map.get(key)?,
            (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string())?,
            (Value::Array(items), Segment::Index(index)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Force-set `path` to `new`, creating intermediate containers as needed.
///
/// A key segment materializes an object, an index segment an array padded
/// with nulls; a scalar in the way is replaced by the needed container.
pub(crate) fn force_set(value: &Value, path: &Path, new: Value) -> Value {
    fn go(current: &Value, segments: &[Segment], new: Value) -> Value {
        let (segment, rest) = match segments.split_first() {
            None => return new,
            Some(split) => split,
        };
        match segment {
            Segment::Key(key) => {
                let mut map = match current {
                    Value::Object(map) => map.clone(),
                    _ => Map::new(),
                };
                let child = map.get(key).cloned().unwrap_or(Value::Null);
                map.insert(key.clone(), go(&child, rest, new));
                Value::Object(map)
            }
            Segment::Index(index) => match current {
                Value::Array(items) => {
                    let mut items = items.clone();
                    while items.len() <= *index {
                        items.push(Value::Null);
                    }
                    let child = items[*index].clone();
                    items[*index] = go(&child, rest, new);
                    Value::Array(items)
                }
                Value::Object(map) => {
                    let key = index.to_string();
                    let mut map = map.clone();
                    let child = map.get(&key).cloned().unwrap_or(Value::Null);
                    map.insert(key, go(&child, rest, new));
                    Value::Object(map)
                }
                _ => {
                    let mut items = vec![Value::Null; *index];
                    items.push(go(&Value::Null, rest, new));
                    Value::Array(items)
                }
            },
        }
    }
    go(value, path.segments(), new)
}

/// Remove the node at `path`; absent paths leave the value unchanged.
pub(crate) fn delete_at(value: &Value, path: &Path) -> Value {
    fn go(current: &Value, segments: &[Segment]) -> Value {
        let (segment, rest) = match segments.split_first() {
            None => return Value::Object(Map::new()),
            Some(split) => split,
        };
        if rest.is_empty() {
            return match (current, segment) {
                (Value::Object(map), Segment::Key(key)) => {
                    let mut map = map.clone();
                    map.remove(key);
                    Value::Object(map)
                }
                (Value::Object(map), Segment::Index(index)) => {
                    let mut map = map.clone();
                    map.remove(&index.to_string());
                    Value::Object(map)
                }
                (Value::Array(items), Segment::Index(index)) if *index < items.len() => {
                    let mut items = items.clone();
                    items.remove(*index);
                    Value::Array(items)
                }
                _ => current.clone(),
            };
        }
        match (current, segment) {
            (Value::Object(map), Segment::Key(key)) => match map.get(key) {
                Some(child) => {
                    let mut map = map.clone();
                    map.insert(key.clone(), go(child, rest));
                    Value::Object(map)
                }
                None => current.clone(),
            },
            (Value::Object(map), Segment::Index(index)) => {
                let key = index.to_string();
                match map.get(&key) {
                    Some(child) => {
                        let mut map = map.clone();
                        map.insert(key, go(child, rest));
                        Value::Object(map)
                    }
                    None => current.clone(),
                }
            }
            (Value::Array(items), Segment::Index(index)) => match items.get(*index) {
                Some(child) => {
                    let mut items = items.clone();
                    items[*index] = go(child, rest);
                    Value::Array(items)
                }
                None => current.clone(),
            },
            _ => current.clone(),
        }
    }
    go(value, path.segments())
}

/// Apply one operation to a JSON value.
pub fn apply_op(value: &Value, op: &PatchOp) -> Value {
    match op {
        PatchOp::Update { path, value: new } | PatchOp::Replace { path, value: new } => {
            force_set(value, path, new.clone())
        }
        PatchOp::Delete { path } => delete_at(value, path),
        PatchOp::Add { path, value: new } => match get_path(value, path) {
            Some(Value::Array(items)) => {
                let mut items = items.clone();
                items.insert(0, new.clone());
                force_set(value, path, Value::Array(items))
            }
            _ => force_set(value, path, new.clone()),
        },
        PatchOp::Remove { path, value: needle } => match get_path(value, path) {
            None => value.clone(),
            Some(Value::Array(items)) => match needle {
                Some(needle) => match items.iter().position(|item| item == needle) {
                    Some(position) => {
                        let mut items = items.clone();
                        items.remove(position);
                        force_set(value, path, Value::Array(items))
                    }
                    None => value.clone(),
                },
                None => delete_at(value, path),
            },
            Some(_) => delete_at(value, path),
        },
        PatchOp::Test { .. } => value.clone(),
        PatchOp::Move { from, path } => match get_path(value, from).cloned() {
            None => value.clone(),
            Some(moved) => {
                let without = delete_at(value, from);
                force_set(&without, path, moved)
            }
        },
        PatchOp::Copy { from, path } => match get_path(value, from).cloned() {
            None => value.clone(),
            Some(copied) => force_set(value, path, copied),
        },
    }
}

/// Apply a patch's operations left-to-right.
pub fn apply_patch(value: &Value, patch: &Patch) -> Value {
    let mut state = value.clone();
    for op in patch.ops() {
        state = apply_op(&state, op);
    }
    state
}

/// Apply a commit's forward patch.
pub fn apply_commit(value: &Value, commit: &Commit) -> Value {
    apply_patch(value, &commit.patch)
}

/// Fold a chain of commits, root toward tip, into a state value.
pub fn apply_chain<'a, I>(initial: &Value, commits: I) -> Value
where
    I: IntoIterator<Item = &'a Commit>,
{
    let mut state = initial.clone();
    for commit in commits {
        state = apply_patch(&state, &commit.patch);
    }
    state
}
