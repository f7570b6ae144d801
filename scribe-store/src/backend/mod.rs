//! Storage backends
//!
//! A backend provides record lookup keyed by `(document_id, commit_id)`,
//! a document-indexed scan in tip→root order, commit→document
//! resolution, and one atomic mutation primitive: [`HistoryBackend::apply`].
//! All transactional behavior of the store is built on that primitive.

pub mod memory;
pub mod sled;

use async_trait::async_trait;

use scribe_core::{ChangeResult, Commit, CommitId, Document, DocumentId};

use crate::batch::WriteBatch;

/// Raw persistence contract beneath the history service.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Fetch a document record.
    async fn get_document(&self, document_id: &DocumentId) -> ChangeResult<Option<Document>>;

    /// Fetch a single commit of a document.
    async fn get_commit(
        &self,
        document_id: &DocumentId,
        commit_id: &CommitId,
    ) -> ChangeResult<Option<Commit>>;

    /// Resolve which document a commit belongs to.
    async fn find_document_of(&self, commit_id: &CommitId) -> ChangeResult<Option<DocumentId>>;

    /// All commits of a document ordered tip-ward → root-ward
    /// (descending `order`).
    async fn list_commits(&self, document_id: &DocumentId) -> ChangeResult<Vec<Commit>>;

    /// Apply a batch of mutations atomically: either every delete and
    /// put lands, or none does.
    async fn apply(&self, batch: WriteBatch) -> ChangeResult<()>;
}

pub use self::sled::SledBackend;
pub use memory::MemoryBackend;
