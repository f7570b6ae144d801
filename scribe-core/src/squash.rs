//! Squash engine
//!
//! Merging two consecutive commits into one equivalent commit. The
//! earlier commit survives: it keeps its id, predecessor link, and order,
//! while the later commit contributes its metadata, autosquash flag, and
//! timestamp. Patches compose forward; reverse patches compose in the
//! opposite order, since undoing "D1 then D2" means undoing D2 first.

use crate::patch::compose;
use crate::types::Commit;

/// Merge `later` into `earlier`, producing the surviving commit.
///
/// Both commits must belong to the same document; a mismatch is a
/// programmer error, not a runtime case.
pub fn do_squash(earlier: &Commit, later: &Commit) -> Commit {
    assert_eq!(
        earlier.document_id, later.document_id,
        "squash across documents"
    );
    Commit {
        id: earlier.id,
        previous_commit_id: earlier.previous_commit_id,
        document_id: earlier.document_id,
        order: earlier.order,
        autosquash: later.autosquash,
        patch: compose(&earlier.patch, &later.patch),
        reverse_patch: compose(&later.reverse_patch, &earlier.reverse_patch),
        meta: later.meta.clone(),
        updated_at: later.updated_at,
    }
}

/// Autosquash eligibility for a commit arriving on top of the tip.
///
/// Both commits must carry the flag and their patches must mutate
/// exactly the same path set.
pub fn autosquash_compatible(tip: &Commit, incoming: &Commit) -> bool {
    tip.autosquash
        && incoming.autosquash
        && tip.patch.target_paths() == incoming.patch.target_paths()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{apply_patch, invert, Patch, PatchOp, Path};
    use crate::types::DocumentId;
    use serde_json::{json, Value};

    fn p(raw: &str) -> Path {
        Path::parse(raw).unwrap()
    }

    fn add(pointer: &str, value: Value) -> Patch {
        Patch::from_ops(vec![PatchOp::Add {
            path: p(pointer),
            value,
        }])
    }

    fn replace(pointer: &str, value: Value) -> Patch {
        Patch::from_ops(vec![PatchOp::Replace {
            path: p(pointer),
            value,
        }])
    }

    /// Build an adjacent pair the way the store persists them: reverse
    /// patches computed against each commit's own pre-state.
    fn adjacent_pair(state: &Value, first: Patch, second: Patch) -> (Commit, Commit, Value) {
        let doc = DocumentId::new();
        let mut earlier = Commit::new(doc, None, first);
        earlier.reverse_patch = invert(state, &earlier.patch);
        let middle = apply_patch(state, &earlier.patch);
        let mut later = Commit::new(doc, Some(earlier.id), second);
        later.order = 1;
        later.reverse_patch = invert(&middle, &later.patch);
        let after = apply_patch(&middle, &later.patch);
        (earlier, later, after)
    }

    #[test]
    fn test_squash_field_inheritance() {
        let state = json!({});
        let (earlier, later, _) =
            adjacent_pair(&state, add("/a", json!(1)), replace("/a", json!(2)));
        let later = later
            .with_meta(json!({"author": "m2"}))
            .with_autosquash(true);

        let combined = do_squash(&earlier, &later);
        assert_eq!(combined.id, earlier.id);
        assert_eq!(combined.previous_commit_id, earlier.previous_commit_id);
        assert_eq!(combined.order, earlier.order);
        assert_eq!(combined.meta, json!({"author": "m2"}));
        assert!(combined.autosquash);
        assert_eq!(combined.updated_at, later.updated_at);
    }

    #[test]
    fn test_squash_forward_identity() {
        // apply(v, squash(p1, p2)) == apply(apply(v, p1), p2)
        let state = json!({"keep": true});
        let (earlier, later, after) =
            adjacent_pair(&state, add("/a", json!(1)), replace("/a", json!(2)));
        let combined = do_squash(&earlier, &later);
        assert_eq!(apply_patch(&state, &combined.patch), after);
        assert_eq!(apply_patch(&state, &combined.patch), json!({"keep": true, "a": 2}));
    }

    #[test]
    fn test_squash_reverse_identity() {
        // Applying the combined reverse to the post-state restores the
        // state before either edit.
        let state = json!({"title": "v0"});
        let (earlier, later, after) = adjacent_pair(
            &state,
            replace("/title", json!("v1")),
            replace("/title", json!("v2")),
        );
        let combined = do_squash(&earlier, &later);
        assert_eq!(apply_patch(&after, &combined.reverse_patch), state);
    }

    #[test]
    fn test_autosquash_requires_flag_on_both() {
        let state = json!({});
        let (earlier, later, _) =
            adjacent_pair(&state, add("/a", json!(1)), replace("/a", json!(2)));
        let earlier = earlier.with_autosquash(true);
        assert!(!autosquash_compatible(&earlier, &later));
        let later = later.with_autosquash(true);
        assert!(autosquash_compatible(&earlier, &later));
    }

    #[test]
    fn test_autosquash_requires_equal_path_sets() {
        let state = json!({});
        let (earlier, later, _) =
            adjacent_pair(&state, add("/a", json!(1)), replace("/b", json!(2)));
        let earlier = earlier.with_autosquash(true);
        let later = later.with_autosquash(true);
        assert!(!autosquash_compatible(&earlier, &later));
    }
}
