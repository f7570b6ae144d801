//! In-memory backend
//!
//! Thread-safe map-based storage, used for tests and development. All
//! maps live behind one `RwLock`, so a batch applied under the write
//! guard is trivially atomic and readers always observe a consistent
//! snapshot.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use scribe_core::{ChangeResult, Commit, CommitId, Document, DocumentId};

use super::HistoryBackend;
use crate::batch::WriteBatch;

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<DocumentId, Document>,
    commits: HashMap<(DocumentId, CommitId), Commit>,
    // Secondary indexes
    by_order: HashMap<DocumentId, BTreeMap<u64, CommitId>>,
    document_of: HashMap<CommitId, DocumentId>,
}

impl Inner {
    fn remove_commit(&mut self, document_id: &DocumentId, commit_id: &CommitId) {
        if let Some(commit) = self.commits.remove(&(*document_id, *commit_id)) {
            if let Some(orders) = self.by_order.get_mut(document_id) {
                orders.remove(&commit.order);
            }
            self.document_of.remove(commit_id);
        }
    }

    fn put_commit(&mut self, commit: Commit) {
        let key = (commit.document_id, commit.id);
        if let Some(existing) = self.commits.get(&key) {
            // The commit may have been renumbered; drop the stale slot.
            if let Some(orders) = self.by_order.get_mut(&commit.document_id) {
                orders.remove(&existing.order);
            }
        }
        self.by_order
            .entry(commit.document_id)
            .or_default()
            .insert(commit.order, commit.id);
        self.document_of.insert(commit.id, commit.document_id);
        self.commits.insert(key, commit);
    }
}

/// Map-backed storage guarded by a single read-write lock.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all stored data.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.documents.clear();
        inner.commits.clear();
        inner.by_order.clear();
        inner.document_of.clear();
    }
}

#[async_trait]
impl HistoryBackend for MemoryBackend {
    async fn get_document(&self, document_id: &DocumentId) -> ChangeResult<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner.documents.get(document_id).cloned())
    }

    async fn get_commit(
        &self,
        document_id: &DocumentId,
        commit_id: &CommitId,
    ) -> ChangeResult<Option<Commit>> {
        let inner = self.inner.read().await;
        Ok(inner.commits.get(&(*document_id, *commit_id)).cloned())
    }

    async fn find_document_of(&self, commit_id: &CommitId) -> ChangeResult<Option<DocumentId>> {
        let inner = self.inner.read().await;
        Ok(inner.document_of.get(commit_id).copied())
    }

    async fn list_commits(&self, document_id: &DocumentId) -> ChangeResult<Vec<Commit>> {
        let inner = self.inner.read().await;
        let orders = match inner.by_order.get(document_id) {
            Some(orders) => orders,
            None => return Ok(Vec::new()),
        };
        Ok(orders
            .values()
            .rev()
            .filter_map(|id| inner.commits.get(&(*document_id, *id)).cloned())
            .collect())
    }

    async fn apply(&self, batch: WriteBatch) -> ChangeResult<()> {
        let mut inner = self.inner.write().await;
        for (document_id, commit_id) in &batch.delete_commits {
            inner.remove_commit(document_id, commit_id);
        }
        for document in batch.put_documents {
            inner.documents.insert(document.id, document);
        }
        for commit in batch.put_commits {
            inner.put_commit(commit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::{Patch, PatchOp, Path};
    use serde_json::json;

    fn commit(document_id: DocumentId, previous: Option<CommitId>, order: u64) -> Commit {
        let mut commit = Commit::new(
            document_id,
            previous,
            Patch::from_ops(vec![PatchOp::Update {
                path: Path::parse("/x").unwrap(),
                value: json!(order),
            }]),
        );
        commit.order = order;
        commit
    }

    #[tokio::test]
    async fn test_apply_and_lookup() {
        let backend = MemoryBackend::new();
        let document = Document::new();
        let root = commit(document.id, None, 0);
        let next = commit(document.id, Some(root.id), 1);

        let mut batch = WriteBatch::new();
        batch.put_document(document.clone());
        batch.put_commit(root.clone());
        batch.put_commit(next.clone());
        backend.apply(batch).await.unwrap();

        assert_eq!(
            backend.get_document(&document.id).await.unwrap(),
            Some(document.clone())
        );
        assert_eq!(
            backend.get_commit(&document.id, &root.id).await.unwrap(),
            Some(root.clone())
        );
        assert_eq!(
            backend.find_document_of(&next.id).await.unwrap(),
            Some(document.id)
        );
    }

    #[tokio::test]
    async fn test_list_is_tip_to_root() {
        let backend = MemoryBackend::new();
        let document = Document::new();
        let root = commit(document.id, None, 0);
        let next = commit(document.id, Some(root.id), 1);

        let mut batch = WriteBatch::new();
        batch.put_document(document.clone());
        batch.put_commit(root.clone());
        batch.put_commit(next.clone());
        backend.apply(batch).await.unwrap();

        let listed = backend.list_commits(&document.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, next.id);
        assert_eq!(listed[1].id, root.id);
    }

    #[tokio::test]
    async fn test_delete_then_put_in_one_batch() {
        let backend = MemoryBackend::new();
        let document = Document::new();
        let root = commit(document.id, None, 0);
        let next = commit(document.id, Some(root.id), 1);

        let mut batch = WriteBatch::new();
        batch.put_document(document.clone());
        batch.put_commit(root.clone());
        batch.put_commit(next.clone());
        backend.apply(batch).await.unwrap();

        // Renumber `next` onto the root slot while removing the root.
        let mut renumbered = next.clone();
        renumbered.order = 0;
        renumbered.previous_commit_id = None;
        let mut batch = WriteBatch::new();
        batch.delete_commit(document.id, root.id);
        batch.put_commit(renumbered.clone());
        backend.apply(batch).await.unwrap();

        let listed = backend.list_commits(&document.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, next.id);
        assert_eq!(listed[0].order, 0);
        assert_eq!(backend.find_document_of(&root.id).await.unwrap(), None);
    }
}
