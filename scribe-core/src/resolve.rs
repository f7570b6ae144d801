//! Conflict resolution
//!
//! Decides whether a batch of incoming commits can be linearized onto an
//! existing history. The incoming chain either already extends the tip,
//! can be rebased onto it, or collides with an intervening edit and is
//! rejected with a precise conflict.

use crate::error::{ChangeError, ChangeResult};
use crate::patch;
use crate::types::Commit;

/// True when the forward patches of two commits mutate a shared path.
pub fn overlap(a: &Commit, b: &Commit) -> bool {
    patch::overlap(&a.patch, &b.patch)
}

/// Linearize `incoming` (root-ward → tip-ward) onto `history` (tip-ward
/// → root-ward).
///
/// Walks history from the tip down to the ancestor the incoming chain
/// claims as parent. If any commit in that span overlaps the first
/// incoming commit, resolution fails with `Conflict`; otherwise the
/// first incoming commit is re-parented onto the current tip and the
/// rest of the chain keeps its internal linkage.
pub fn resolve_conflicts(incoming: Vec<Commit>, history: &[Commit]) -> ChangeResult<Vec<Commit>> {
    if incoming.is_empty() || history.is_empty() {
        return Ok(incoming);
    }
    let tip = &history[0];
    let first = &incoming[0];
    if first.previous_commit_id == Some(tip.id) {
        return Ok(incoming);
    }
    for existing in history {
        if Some(existing.id) == first.previous_commit_id {
            break;
        }
        if overlap(first, existing) {
            return Err(ChangeError::Conflict {
                commit_id: first.id,
                conflicts_with: existing.id,
            });
        }
    }
    let tip_id = tip.id;
    let mut rebased = incoming;
    rebased[0].previous_commit_id = Some(tip_id);
    Ok(rebased)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{Patch, PatchOp, Path};
    use crate::types::{CommitId, DocumentId};
    use serde_json::json;

    fn edit(pointer: &str) -> Patch {
        Patch::from_ops(vec![PatchOp::Replace {
            path: Path::parse(pointer).unwrap(),
            value: json!(1),
        }])
    }

    fn commit(doc: DocumentId, previous: Option<CommitId>, pointer: &str) -> Commit {
        Commit::new(doc, previous, edit(pointer))
    }

    #[test]
    fn test_empty_incoming_is_success() {
        let doc = DocumentId::new();
        let history = vec![commit(doc, None, "/x")];
        let resolved = resolve_conflicts(Vec::new(), &history).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_empty_history_accepts_verbatim() {
        let doc = DocumentId::new();
        let incoming = vec![commit(doc, None, "/x")];
        let resolved = resolve_conflicts(incoming.clone(), &[]).unwrap();
        assert_eq!(resolved, incoming);
    }

    #[test]
    fn test_chain_extending_tip_is_unchanged() {
        let doc = DocumentId::new();
        let h1 = commit(doc, None, "/x");
        let incoming = vec![commit(doc, Some(h1.id), "/y")];
        let resolved = resolve_conflicts(incoming.clone(), &[h1]).unwrap();
        assert_eq!(resolved, incoming);
    }

    #[test]
    fn test_rebase_without_overlap() {
        // History is [H2 <- H1] (tip first); incoming forked from H1 and
        // touches a path H2 does not.
        let doc = DocumentId::new();
        let h1 = commit(doc, None, "/x");
        let h2 = commit(doc, Some(h1.id), "/y");
        let incoming = vec![commit(doc, Some(h1.id), "/z")];
        let original = incoming[0].clone();

        let resolved = resolve_conflicts(incoming, &[h2.clone(), h1]).unwrap();
        assert_eq!(resolved[0].previous_commit_id, Some(h2.id));
        assert_eq!(resolved[0].id, original.id);
        assert_eq!(resolved[0].patch, original.patch);
    }

    #[test]
    fn test_overlap_between_fork_and_tip_conflicts() {
        let doc = DocumentId::new();
        let h1 = commit(doc, None, "/x");
        let h2 = commit(doc, Some(h1.id), "/y");
        let incoming = vec![commit(doc, Some(h1.id), "/y")];
        let incoming_id = incoming[0].id;

        let err = resolve_conflicts(incoming, &[h2.clone(), h1]).unwrap_err();
        match err {
            ChangeError::Conflict {
                commit_id,
                conflicts_with,
            } => {
                assert_eq!(commit_id, incoming_id);
                assert_eq!(conflicts_with, h2.id);
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_stops_at_declared_ancestor() {
        // H1 touches the same path as the incoming commit, but it is the
        // declared ancestor, so it is not part of the conflict span.
        let doc = DocumentId::new();
        let h1 = commit(doc, None, "/z");
        let h2 = commit(doc, Some(h1.id), "/y");
        let incoming = vec![commit(doc, Some(h1.id), "/z")];

        let resolved = resolve_conflicts(incoming, &[h2.clone(), h1]).unwrap();
        assert_eq!(resolved[0].previous_commit_id, Some(h2.id));
    }

    #[test]
    fn test_only_first_commit_is_reparented() {
        let doc = DocumentId::new();
        let h1 = commit(doc, None, "/x");
        let h2 = commit(doc, Some(h1.id), "/y");
        let a = commit(doc, Some(h1.id), "/z");
        let b = commit(doc, Some(a.id), "/w");
        let b_id = b.id;
        let a_id = a.id;

        let resolved = resolve_conflicts(vec![a, b], &[h2.clone(), h1]).unwrap();
        assert_eq!(resolved[0].previous_commit_id, Some(h2.id));
        assert_eq!(resolved[1].id, b_id);
        assert_eq!(resolved[1].previous_commit_id, Some(a_id));
    }
}
