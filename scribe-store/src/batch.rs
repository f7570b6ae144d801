//! Write batches
//!
//! A `WriteBatch` is the unit of mutation handed to a backend. Backends
//! apply the whole batch or none of it. Deletes are applied before puts,
//! so a batch may delete a commit and re-put another under the same
//! document in one step (squash does exactly that).

use scribe_core::{Commit, CommitId, Document, DocumentId};

/// An atomic set of mutations.
#[derive(Debug, Default)]
pub struct WriteBatch {
    /// Documents to insert or overwrite
    pub put_documents: Vec<Document>,
    /// Commits to insert or overwrite
    pub put_commits: Vec<Commit>,
    /// Commits to remove, keyed by document and commit id
    pub delete_commits: Vec<(DocumentId, CommitId)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.put_documents.is_empty()
            && self.put_commits.is_empty()
            && self.delete_commits.is_empty()
    }

    pub fn put_document(&mut self, document: Document) {
        self.put_documents.push(document);
    }

    pub fn put_commit(&mut self, commit: Commit) {
        self.put_commits.push(commit);
    }

    pub fn delete_commit(&mut self, document_id: DocumentId, commit_id: CommitId) {
        self.delete_commits.push((document_id, commit_id));
    }
}
