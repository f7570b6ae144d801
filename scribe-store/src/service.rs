//! History service
//!
//! Implements the `HistoryStore` contract on top of a raw backend. Each
//! operation runs as one transaction: the service reads a consistent
//! view of the document's chain, stages every mutation into a single
//! `WriteBatch`, and hands it to the backend's atomic `apply`. Writers
//! are serialized on a store-wide mutex, so a racing writer observes the
//! winner's commit when it retries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use scribe_core::{
    apply_chain, apply_patch, autosquash_compatible, do_squash, invert, resolve_conflicts,
    validate, validate_many, ChangeError, ChangeResult, Commit, CommitId, Document, DocumentId,
    HistoryStore,
};

use crate::backend::{HistoryBackend, MemoryBackend, SledBackend};
use crate::batch::WriteBatch;
use crate::config::StoreConfig;

/// In-memory view of one document's chain during a staged transaction.
struct ChainView {
    document_id: DocumentId,
    /// Commits tip-ward → root-ward
    commits: Vec<Commit>,
    /// Materialized state at the tip
    state: Value,
}

impl ChainView {
    fn tip(&self) -> Option<&Commit> {
        self.commits.first()
    }

    fn next_order(&self) -> u64 {
        self.tip().map(|tip| tip.order + 1).unwrap_or(0)
    }
}

/// The history store service.
pub struct HistoryService {
    backend: Arc<dyn HistoryBackend>,
    write_lock: Mutex<()>,
}

impl HistoryService {
    /// Create a service over an existing backend.
    pub fn new(backend: Arc<dyn HistoryBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a service over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Open a service from configuration: in-memory when `data_dir` is
    /// empty, sled otherwise.
    pub fn open(config: &StoreConfig) -> ChangeResult<Self> {
        if config.is_in_memory() {
            Ok(Self::in_memory())
        } else {
            Ok(Self::new(Arc::new(SledBackend::new(config)?)))
        }
    }

    /// The underlying backend handle.
    pub fn backend(&self) -> &Arc<dyn HistoryBackend> {
        &self.backend
    }

    async fn load_view(&self, document_id: &DocumentId) -> ChangeResult<ChainView> {
        self.require_document(document_id).await?;
        let commits = self.backend.list_commits(document_id).await?;
        let state = apply_chain(&json!({}), commits.iter().rev());
        Ok(ChainView {
            document_id: *document_id,
            commits,
            state,
        })
    }

    async fn require_document(&self, document_id: &DocumentId) -> ChangeResult<Document> {
        self.backend
            .get_document(document_id)
            .await?
            .ok_or(ChangeError::DoesNotExist {
                entity: "document",
                id: document_id.to_string(),
            })
    }

    /// Validate and stage one commit onto the view, recording the
    /// mutations in `batch`. Assigns `order`, computes `reverse_patch`,
    /// and merges compatible autosquash commits into the tip.
    async fn stage_write(
        &self,
        view: &mut ChainView,
        batch: &mut WriteBatch,
        staged: &mut HashSet<CommitId>,
        mut commit: Commit,
    ) -> ChangeResult<Commit> {
        validate(&commit)?;
        if commit.document_id != view.document_id {
            return Err(ChangeError::Validation {
                entity: "commit",
                field: "document_id",
                expected: view.document_id.to_string(),
                got: commit.document_id.to_string(),
            });
        }
        if staged.contains(&commit.id)
            || view.commits.iter().any(|existing| existing.id == commit.id)
            || self.backend.find_document_of(&commit.id).await?.is_some()
        {
            return Err(ChangeError::AlreadyExist {
                entity: "commit",
                id: commit.id.to_string(),
            });
        }

        // Linear append: the parent must be the current tip. A parent
        // with an existing successor is the racing-writer case; the
        // caller re-reads the tip and retries.
        match commit.previous_commit_id {
            None => {
                if let Some(root) = view.commits.last() {
                    return Err(ChangeError::AlreadyExist {
                        entity: "commit",
                        id: root.id.to_string(),
                    });
                }
            }
            Some(parent) => match view.commits.iter().position(|c| c.id == parent) {
                None => {
                    return Err(ChangeError::DoesNotExist {
                        entity: "commit",
                        id: parent.to_string(),
                    })
                }
                Some(0) => {}
                Some(position) => {
                    let successor = &view.commits[position - 1];
                    return Err(ChangeError::AlreadyExist {
                        entity: "commit",
                        id: successor.id.to_string(),
                    });
                }
            },
        }

        commit.order = view.next_order();
        commit.reverse_patch = invert(&view.state, &commit.patch);
        staged.insert(commit.id);

        let tip = view.tip().cloned();
        if let Some(tip) = tip {
            if autosquash_compatible(&tip, &commit) {
                let combined = do_squash(&tip, &commit);
                debug!(
                    document_id = %view.document_id,
                    commit_id = %combined.id,
                    absorbed = %commit.id,
                    "autosquash into tip"
                );
                batch.put_commit(combined.clone());
                view.state = apply_patch(&view.state, &commit.patch);
                view.commits[0] = combined.clone();
                return Ok(combined);
            }
        }

        batch.put_commit(commit.clone());
        view.state = apply_patch(&view.state, &commit.patch);
        view.commits.insert(0, commit.clone());
        Ok(commit)
    }

    fn find_in_view<'a>(view: &'a ChainView, commit_id: &CommitId) -> Option<&'a Commit> {
        view.commits.iter().find(|commit| commit.id == *commit_id)
    }

    /// Stage the removal of a chain member: re-parent its successor and
    /// close the order gap so orders stay dense.
    fn stage_unlink(
        view: &ChainView,
        batch: &mut WriteBatch,
        removed: &Commit,
        new_parent: Option<CommitId>,
    ) {
        for commit in &view.commits {
            if commit.order <= removed.order {
                continue;
            }
            let mut updated = commit.clone();
            updated.order -= 1;
            if updated.previous_commit_id == Some(removed.id) {
                updated.previous_commit_id = new_parent;
            }
            batch.put_commit(updated);
        }
    }
}

#[async_trait]
impl HistoryStore for HistoryService {
    async fn create_document(&self, document: Document) -> ChangeResult<Document> {
        scribe_core::validate::uuid4("document", "id", &document.id.to_string())?;
        let _guard = self.write_lock.lock().await;
        if self.backend.get_document(&document.id).await?.is_some() {
            return Err(ChangeError::AlreadyExist {
                entity: "document",
                id: document.id.to_string(),
            });
        }
        let mut batch = WriteBatch::new();
        batch.put_document(document.clone());
        self.backend.apply(batch).await?;
        info!(document_id = %document.id, operation = "create_document", "document registered");
        Ok(document)
    }

    async fn get_document(&self, document_id: &DocumentId) -> ChangeResult<Document> {
        self.require_document(document_id).await
    }

    async fn list(&self, document_id: &DocumentId) -> ChangeResult<Vec<Commit>> {
        self.require_document(document_id).await?;
        self.backend.list_commits(document_id).await
    }

    async fn list_range(
        &self,
        document_id: &DocumentId,
        from: Option<&CommitId>,
        to: Option<&CommitId>,
    ) -> ChangeResult<Vec<Commit>> {
        let commits = self.list(document_id).await?;
        if commits.is_empty() {
            return Ok(commits);
        }
        let order_of = |selector: Option<&CommitId>, fallback: u64| -> ChangeResult<u64> {
            match selector {
                None => Ok(fallback),
                Some(commit_id) => commits
                    .iter()
                    .find(|commit| commit.id == *commit_id)
                    .map(|commit| commit.order)
                    .ok_or(ChangeError::DoesNotExist {
                        entity: "commit",
                        id: commit_id.to_string(),
                    }),
            }
        };
        let from_order = order_of(from, commits[0].order)?;
        let to_order = order_of(to, 0)?;
        Ok(commits
            .into_iter()
            .filter(|commit| commit.order >= to_order && commit.order <= from_order)
            .collect())
    }

    async fn get(&self, document_id: &DocumentId, commit_id: &CommitId) -> ChangeResult<Commit> {
        self.require_document(document_id).await?;
        self.backend
            .get_commit(document_id, commit_id)
            .await?
            .ok_or(ChangeError::DoesNotExist {
                entity: "commit",
                id: commit_id.to_string(),
            })
    }

    async fn write(&self, commit: Commit) -> ChangeResult<Commit> {
        let _guard = self.write_lock.lock().await;
        let mut view = self.load_view(&commit.document_id).await?;
        let mut batch = WriteBatch::new();
        let mut staged = HashSet::new();
        let written = self
            .stage_write(&mut view, &mut batch, &mut staged, commit)
            .await?;
        self.backend.apply(batch).await?;
        info!(
            document_id = %written.document_id,
            commit_id = %written.id,
            order = written.order,
            operation = "write",
            "commit written"
        );
        Ok(written)
    }

    async fn write_many(&self, commits: Vec<Commit>) -> ChangeResult<Vec<Commit>> {
        if commits.is_empty() {
            return Ok(Vec::new());
        }
        let _guard = self.write_lock.lock().await;
        let mut views: HashMap<DocumentId, ChainView> = HashMap::new();
        let mut batch = WriteBatch::new();
        let mut staged = HashSet::new();
        let mut written = Vec::with_capacity(commits.len());
        for commit in commits {
            let document_id = commit.document_id;
            if !views.contains_key(&document_id) {
                views.insert(document_id, self.load_view(&document_id).await?);
            }
            let view = views
                .get_mut(&document_id)
                .ok_or_else(|| ChangeError::Storage("document view vanished".to_string()))?;
            written.push(self.stage_write(view, &mut batch, &mut staged, commit).await?);
        }
        self.backend.apply(batch).await?;
        info!(
            count = written.len(),
            operation = "write_many",
            "commit batch written"
        );
        Ok(written)
    }

    async fn add_commits(&self, commits: Vec<Commit>) -> ChangeResult<Vec<Commit>> {
        validate_many(&commits)?;
        if commits.is_empty() {
            return Ok(Vec::new());
        }
        let document_id = commits[0].document_id;
        let _guard = self.write_lock.lock().await;
        let mut view = self.load_view(&document_id).await?;
        let resolved = resolve_conflicts(commits, &view.commits)?;
        let mut batch = WriteBatch::new();
        let mut staged = HashSet::new();
        let mut written = Vec::with_capacity(resolved.len());
        for commit in resolved {
            written.push(
                self.stage_write(&mut view, &mut batch, &mut staged, commit)
                    .await?,
            );
        }
        self.backend.apply(batch).await?;
        info!(
            document_id = %document_id,
            count = written.len(),
            operation = "add_commits",
            "incoming chain linearized"
        );
        Ok(written)
    }

    async fn squash(&self, earlier_id: &CommitId, later_id: &CommitId) -> ChangeResult<Commit> {
        let _guard = self.write_lock.lock().await;
        let document_id = self
            .backend
            .find_document_of(earlier_id)
            .await?
            .ok_or(ChangeError::DoesNotExist {
                entity: "commit",
                id: earlier_id.to_string(),
            })?;
        let later_document = self
            .backend
            .find_document_of(later_id)
            .await?
            .ok_or(ChangeError::DoesNotExist {
                entity: "commit",
                id: later_id.to_string(),
            })?;
        if later_document != document_id {
            return Err(ChangeError::Validation {
                entity: "commit",
                field: "document_id",
                expected: document_id.to_string(),
                got: later_document.to_string(),
            });
        }

        let view = self.load_view(&document_id).await?;
        let earlier = Self::find_in_view(&view, earlier_id).ok_or(ChangeError::DoesNotExist {
            entity: "commit",
            id: earlier_id.to_string(),
        })?;
        let later = Self::find_in_view(&view, later_id).ok_or(ChangeError::DoesNotExist {
            entity: "commit",
            id: later_id.to_string(),
        })?;
        if later.previous_commit_id != Some(earlier.id) {
            return Err(ChangeError::Validation {
                entity: "commit",
                field: "previous_commit_id",
                expected: earlier.id.to_string(),
                got: later
                    .previous_commit_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "absent".to_string()),
            });
        }

        let combined = do_squash(earlier, later);
        let mut batch = WriteBatch::new();
        batch.put_commit(combined.clone());
        batch.delete_commit(document_id, later.id);
        // The absorbed commit's successor now follows the combined
        // commit, and every later order shifts down by one.
        Self::stage_unlink(&view, &mut batch, later, Some(earlier.id));
        self.backend.apply(batch).await?;
        info!(
            document_id = %document_id,
            commit_id = %combined.id,
            absorbed = %later_id,
            operation = "squash",
            "commits squashed"
        );
        Ok(combined)
    }

    async fn delete(&self, commit_id: &CommitId) -> ChangeResult<()> {
        let _guard = self.write_lock.lock().await;
        let document_id = match self.backend.find_document_of(commit_id).await? {
            Some(document_id) => document_id,
            // Idempotent: deleting an absent commit succeeds.
            None => return Ok(()),
        };
        let view = self.load_view(&document_id).await?;
        let target = match Self::find_in_view(&view, commit_id) {
            Some(target) => target.clone(),
            None => return Ok(()),
        };
        let mut batch = WriteBatch::new();
        batch.delete_commit(document_id, target.id);
        Self::stage_unlink(&view, &mut batch, &target, target.previous_commit_id);
        self.backend.apply(batch).await?;
        info!(
            document_id = %document_id,
            commit_id = %commit_id,
            operation = "delete",
            "commit deleted"
        );
        Ok(())
    }

    async fn materialize(&self, document_id: &DocumentId) -> ChangeResult<Value> {
        let commits = self.list(document_id).await?;
        Ok(apply_chain(&json!({}), commits.iter().rev()))
    }

    async fn state_at(
        &self,
        document_id: &DocumentId,
        commit_id: &CommitId,
    ) -> ChangeResult<Value> {
        let commits = self.list(document_id).await?;
        let target = commits
            .iter()
            .find(|commit| commit.id == *commit_id)
            .ok_or(ChangeError::DoesNotExist {
                entity: "commit",
                id: commit_id.to_string(),
            })?;
        let upto = target.order;
        Ok(apply_chain(
            &json!({}),
            commits
                .iter()
                .rev()
                .filter(|commit| commit.order <= upto),
        ))
    }

    async fn verify_integrity(&self, document_id: &DocumentId) -> ChangeResult<bool> {
        let commits = self.list(document_id).await?;
        if commits.is_empty() {
            return Ok(true);
        }
        let roots = commits.iter().filter(|commit| commit.is_root()).count();
        if roots != 1 {
            return Ok(false);
        }
        for commit in &commits {
            if validate(commit).is_err() {
                return Ok(false);
            }
        }
        // The listing is ordered tip→root, so adjacency must match both
        // the parent links and dense decreasing orders.
        for pair in commits.windows(2) {
            if pair[0].previous_commit_id != Some(pair[1].id) {
                return Ok(false);
            }
            if pair[0].order != pair[1].order + 1 {
                return Ok(false);
            }
        }
        let root = &commits[commits.len() - 1];
        Ok(root.is_root() && root.order == 0)
    }
}
