//! JSON patch dialect
//!
//! Patches are ordered lists of operations against paths in a JSON value.
//! Operation objects carry RFC 6902 shapes (`{op, path, value?, from?}`)
//! with paths written as RFC 6901 pointers.
//!
//! The algebra lives in the submodules:
//! - [`apply`] — fold operations into a document state
//! - [`compose`] — forward composition of two patches
//! - [`invert`] — derive the reverse patch against a pre-state
//! - [`overlap`] — shared-path detection between patches

mod apply;
mod compose;
mod invert;
mod overlap;

pub use apply::{apply_chain, apply_commit, apply_op, apply_patch};
pub use compose::compose;
pub use invert::invert;
pub use overlap::{overlap, paths_overlap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Error raised when a string is not a well-formed pointer path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Non-empty paths must start with `/`
    #[error("path must be empty or start with '/': {0}")]
    NotAPointer(String),
    /// `~` must be followed by `0` or `1`
    #[error("invalid escape in path segment: {0}")]
    BadEscape(String),
}

/// One segment of a path: an object key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => {
                write!(f, "{}", k.replace('~', "~0").replace('/', "~1"))
            }
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

/// A path into a JSON value, as a sequence of string/integer segments.
///
/// The empty path addresses the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Path(Vec<Segment>);

impl Path {
    /// The whole-document path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse an RFC 6901 pointer string.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Ok(Self::root());
        }
        if !raw.starts_with('/') {
            return Err(PathError::NotAPointer(raw.to_string()));
        }
        let mut segments = Vec::new();
        for token in raw.split('/').skip(1) {
            segments.push(Self::parse_segment(token)?);
        }
        Ok(Self(segments))
    }

    fn parse_segment(token: &str) -> Result<Segment, PathError> {
        let mut out = String::with_capacity(token.len());
        let mut chars = token.chars();
        while let Some(c) = chars.next() {
            if c == '~' {
                match chars.next() {
                    Some('0') => out.push('~'),
                    Some('1') => out.push('/'),
                    _ => return Err(PathError::BadEscape(token.to_string())),
                }
            } else {
                out.push(c);
            }
        }
        // Digit-only tokens address list positions; a leading zero keeps
        // the token as an object key ("0" itself is an index).
        let is_index = !out.is_empty()
            && out.chars().all(|c| c.is_ascii_digit())
            && (out == "0" || !out.starts_with('0'));
        if is_index {
            if let Ok(index) = out.parse::<usize>() {
                return Ok(Segment::Index(index));
            }
        }
        Ok(Segment::Key(out))
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// True for the whole-document path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `self` addresses `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Path::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A single patch operation.
///
/// `update`/`replace` force-set, `delete` removes a node, `add` prepends
/// into lists and force-sets elsewhere, `remove` drops a list element by
/// value or deletes a non-list node, `test` asserts without mutating,
/// `move`/`copy` relocate or duplicate a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Update {
        path: Path,
        value: Value,
    },
    Replace {
        path: Path,
        value: Value,
    },
    Delete {
        path: Path,
    },
    Add {
        path: Path,
        value: Value,
    },
    Remove {
        path: Path,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    Test {
        path: Path,
        value: Value,
    },
    Move {
        from: Path,
        path: Path,
    },
    Copy {
        from: Path,
        path: Path,
    },
}

impl PatchOp {
    /// Target path of the operation.
    pub fn path(&self) -> &Path {
        match self {
            Self::Update { path, .. }
            | Self::Replace { path, .. }
            | Self::Delete { path }
            | Self::Add { path, .. }
            | Self::Remove { path, .. }
            | Self::Test { path, .. }
            | Self::Move { path, .. }
            | Self::Copy { path, .. } => path,
        }
    }

    /// Paths this operation mutates. Empty for `test`.
    pub fn mutated_paths(&self) -> Vec<&Path> {
        match self {
            Self::Test { .. } => Vec::new(),
            Self::Move { from, path } => vec![from, path],
            other => vec![other.path()],
        }
    }
}

/// An ordered list of patch operations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Vec<PatchOp>);

impl Patch {
    /// Build a patch from operations.
    pub fn from_ops(ops: Vec<PatchOp>) -> Self {
        Self(ops)
    }

    /// The operations, in application order.
    pub fn ops(&self) -> &[PatchOp] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The set of paths this patch mutates.
    pub fn target_paths(&self) -> BTreeSet<Path> {
        self.0
            .iter()
            .flat_map(|op| op.mutated_paths())
            .cloned()
            .collect()
    }

    /// Constraint check beyond what the types enforce: `move`/`copy` may
    /// not relocate a node into itself or its own subtree.
    pub fn validate(&self) -> Result<(), String> {
        for op in &self.0 {
            if let PatchOp::Move { from, path } | PatchOp::Copy { from, path } = op {
                if from == path || from.is_prefix_of(path) {
                    return Err(format!(
                        "cannot {} {} into {}",
                        if matches!(op, PatchOp::Move { .. }) {
                            "move"
                        } else {
                            "copy"
                        },
                        from,
                        path
                    ));
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<PatchOp> for Patch {
    fn from_iter<I: IntoIterator<Item = PatchOp>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_parse_segments() {
        let path = Path::parse("/a/0/b").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("a".to_string()),
                Segment::Index(0),
                Segment::Key("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_path_parse_root_and_errors() {
        assert!(Path::parse("").unwrap().is_root());
        assert!(Path::parse("a/b").is_err());
        assert!(Path::parse("/a~2b").is_err());
    }

    #[test]
    fn test_path_escapes_roundtrip() {
        let path = Path::parse("/a~1b/c~0d").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("a/b".to_string()),
                Segment::Key("c~d".to_string()),
            ]
        );
        assert_eq!(path.to_string(), "/a~1b/c~0d");
    }

    #[test]
    fn test_leading_zero_is_a_key() {
        let path = Path::parse("/01").unwrap();
        assert_eq!(path.segments(), &[Segment::Key("01".to_string())]);
    }

    #[test]
    fn test_prefix_detection() {
        let parent = Path::parse("/a").unwrap();
        let child = Path::parse("/a/b").unwrap();
        let sibling = Path::parse("/b").unwrap();
        assert!(parent.is_prefix_of(&child));
        assert!(parent.is_prefix_of(&parent));
        assert!(!parent.is_prefix_of(&sibling));
        assert!(!child.is_prefix_of(&parent));
    }

    #[test]
    fn test_patch_op_serde_shape() {
        let op = PatchOp::Add {
            path: Path::parse("/x").unwrap(),
            value: json!(1),
        };
        let encoded = serde_json::to_value(&op).unwrap();
        assert_eq!(encoded, json!({"op": "add", "path": "/x", "value": 1}));
        let decoded: PatchOp = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn test_remove_value_is_optional() {
        let decoded: PatchOp = serde_json::from_value(json!({"op": "remove", "path": "/x"})).unwrap();
        assert_eq!(
            decoded,
            PatchOp::Remove {
                path: Path::parse("/x").unwrap(),
                value: None,
            }
        );
    }

    #[test]
    fn test_target_paths_exclude_test() {
        let patch = Patch::from_ops(vec![
            PatchOp::Update {
                path: Path::parse("/a").unwrap(),
                value: json!(1),
            },
            PatchOp::Test {
                path: Path::parse("/b").unwrap(),
                value: json!(2),
            },
        ]);
        let paths = patch.target_paths();
        assert!(paths.contains(&Path::parse("/a").unwrap()));
        assert!(!paths.contains(&Path::parse("/b").unwrap()));
    }

    #[test]
    fn test_move_into_own_subtree_is_invalid() {
        let patch = Patch::from_ops(vec![PatchOp::Move {
            from: Path::parse("/a").unwrap(),
            path: Path::parse("/a/b").unwrap(),
        }]);
        assert!(patch.validate().is_err());
    }
}
