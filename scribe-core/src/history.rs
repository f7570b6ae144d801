//! History store contract
//!
//! The storage-facing API surface of the core. Implementations persist
//! commit chains under an atomic transaction primitive: every method
//! either commits its effects as a whole (`Ok`) or rolls back and
//! surfaces the abort reason unchanged (`Err`). Store calls are the only
//! suspension points of the core.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ChangeResult;
use crate::types::{Commit, CommitId, Document, DocumentId};

/// Persistence contract for document histories.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Register a new document. Fails with `AlreadyExist` on a duplicate
    /// id.
    async fn create_document(&self, document: Document) -> ChangeResult<Document>;

    /// Fetch a document record, or `DoesNotExist`.
    async fn get_document(&self, document_id: &DocumentId) -> ChangeResult<Document>;

    /// All commits of a document, tip-ward → root-ward.
    async fn list(&self, document_id: &DocumentId) -> ChangeResult<Vec<Commit>>;

    /// Commits with `order` in `[to.order, from.order]`, tip-ward →
    /// root-ward. A missing `from` means the current tip, a missing `to`
    /// means the root.
    async fn list_range(
        &self,
        document_id: &DocumentId,
        from: Option<&CommitId>,
        to: Option<&CommitId>,
    ) -> ChangeResult<Vec<Commit>>;

    /// A single commit, or `DoesNotExist`.
    async fn get(&self, document_id: &DocumentId, commit_id: &CommitId) -> ChangeResult<Commit>;

    /// Append one commit to its document's chain.
    ///
    /// Validates the commit, requires the referenced document and parent
    /// to exist, rejects duplicate ids, assigns `order`, and computes
    /// `reverse_patch`. The parent must be the current tip: a parent that
    /// already has a successor aborts with `AlreadyExist` carrying the
    /// successor's id (the racing-writer signal — re-read the tip and
    /// retry). Compatible autosquash commits are merged into the tip in
    /// place.
    async fn write(&self, commit: Commit) -> ChangeResult<Commit>;

    /// Atomic batch of [`write`](Self::write); all-or-nothing.
    async fn write_many(&self, commits: Vec<Commit>) -> ChangeResult<Vec<Commit>>;

    /// Validate, resolve conflicts against current history (rebasing
    /// when possible), and persist — one transaction. This is the
    /// lenient counterpart of the strictly-appending `write`.
    async fn add_commits(&self, commits: Vec<Commit>) -> ChangeResult<Vec<Commit>>;

    /// Merge the adjacent commit `later_id` into `earlier_id`, deleting
    /// the absorbed commit and repairing successor linkage atomically.
    async fn squash(&self, earlier_id: &CommitId, later_id: &CommitId) -> ChangeResult<Commit>;

    /// Delete a commit. Idempotent: deleting an absent commit succeeds.
    async fn delete(&self, commit_id: &CommitId) -> ChangeResult<()>;

    /// Fold the document's chain into its state value.
    async fn materialize(&self, document_id: &DocumentId) -> ChangeResult<Value>;

    /// The document state as of the given commit, inclusive.
    async fn state_at(&self, document_id: &DocumentId, commit_id: &CommitId)
        -> ChangeResult<Value>;

    /// Re-check the chain invariants over the persisted history.
    async fn verify_integrity(&self, document_id: &DocumentId) -> ChangeResult<bool>;
}
