//! Sled persistent backend
//!
//! Embedded on-disk storage. Records are serde_json bytes; commit keys
//! compound the document and commit UUIDs so a document's records stay
//! prefix-scannable. Two index trees keep tip→root listing and bare
//! commit-id resolution cheap:
//!
//! - `order_index`: document ++ big-endian order → commit id
//! - `commit_index`: commit id → document id
//!
//! Batches go through `sled::Transactional` across all four trees, so a
//! failed batch leaves no partial writes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use sled::Transactional;
use std::path::Path as FsPath;

use scribe_core::{ChangeError, ChangeResult, Commit, CommitId, Document, DocumentId};

use super::HistoryBackend;
use crate::batch::WriteBatch;
use crate::config::StoreConfig;

const DOCUMENTS_TREE: &str = "documents";
const COMMITS_TREE: &str = "commits";
const ORDER_INDEX_TREE: &str = "order_index";
const COMMIT_INDEX_TREE: &str = "commit_index";

/// Sled-backed history storage.
#[derive(Debug, Clone)]
pub struct SledBackend {
    db: sled::Db,
    documents: sled::Tree,
    commits: sled::Tree,
    order_index: sled::Tree,
    commit_index: sled::Tree,
    flush_on_write: bool,
}

impl SledBackend {
    /// Open using a store configuration.
    pub fn new(config: &StoreConfig) -> ChangeResult<Self> {
        let mut backend = Self::open(&config.data_dir)?;
        backend.flush_on_write = config.flush_on_write;
        Ok(backend)
    }

    /// Open or create a sled database at `path`.
    pub fn open<P: AsRef<FsPath>>(path: P) -> ChangeResult<Self> {
        let db = sled::open(path).map_err(storage_error)?;
        let documents = db.open_tree(DOCUMENTS_TREE).map_err(storage_error)?;
        let commits = db.open_tree(COMMITS_TREE).map_err(storage_error)?;
        let order_index = db.open_tree(ORDER_INDEX_TREE).map_err(storage_error)?;
        let commit_index = db.open_tree(COMMIT_INDEX_TREE).map_err(storage_error)?;
        Ok(Self {
            db,
            documents,
            commits,
            order_index,
            commit_index,
            flush_on_write: true,
        })
    }

    /// Flush outstanding writes to disk.
    pub async fn flush(&self) -> ChangeResult<()> {
        self.db.flush_async().await.map_err(storage_error)?;
        Ok(())
    }

    fn serialize<T: Serialize>(value: &T) -> ChangeResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> ChangeResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn commit_key(document_id: &DocumentId, commit_id: &CommitId) -> Vec<u8> {
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(document_id.as_uuid().as_bytes());
        key.extend_from_slice(commit_id.as_uuid().as_bytes());
        key
    }

    fn order_key(document_id: &DocumentId, order: u64) -> Vec<u8> {
        let mut key = Vec::with_capacity(24);
        key.extend_from_slice(document_id.as_uuid().as_bytes());
        key.extend_from_slice(&order.to_be_bytes());
        key
    }
}

fn storage_error(error: impl std::fmt::Display) -> ChangeError {
    ChangeError::Storage(error.to_string())
}

type TxError = ConflictableTransactionError<ChangeError>;

fn tx_serde(error: serde_json::Error) -> TxError {
    ConflictableTransactionError::Abort(ChangeError::Serialization(error))
}

#[async_trait]
impl HistoryBackend for SledBackend {
    async fn get_document(&self, document_id: &DocumentId) -> ChangeResult<Option<Document>> {
        match self
            .documents
            .get(document_id.as_uuid().as_bytes())
            .map_err(storage_error)?
        {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_commit(
        &self,
        document_id: &DocumentId,
        commit_id: &CommitId,
    ) -> ChangeResult<Option<Commit>> {
        match self
            .commits
            .get(Self::commit_key(document_id, commit_id))
            .map_err(storage_error)?
        {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_document_of(&self, commit_id: &CommitId) -> ChangeResult<Option<DocumentId>> {
        match self
            .commit_index
            .get(commit_id.as_uuid().as_bytes())
            .map_err(storage_error)?
        {
            Some(bytes) => {
                let uuid = uuid::Uuid::from_slice(&bytes)
                    .map_err(|e| ChangeError::Storage(format!("corrupt commit index: {}", e)))?;
                Ok(Some(DocumentId(uuid)))
            }
            None => Ok(None),
        }
    }

    async fn list_commits(&self, document_id: &DocumentId) -> ChangeResult<Vec<Commit>> {
        let mut commits = Vec::new();
        // order_index is ascending by order; walk it backwards for the
        // tip→root contract.
        for entry in self
            .order_index
            .scan_prefix(document_id.as_uuid().as_bytes())
            .rev()
        {
            let (_, id_bytes) = entry.map_err(storage_error)?;
            let uuid = uuid::Uuid::from_slice(&id_bytes)
                .map_err(|e| ChangeError::Storage(format!("corrupt order index: {}", e)))?;
            let commit_id = CommitId(uuid);
            match self
                .commits
                .get(Self::commit_key(document_id, &commit_id))
                .map_err(storage_error)?
            {
                Some(bytes) => commits.push(Self::deserialize(&bytes)?),
                None => {
                    return Err(ChangeError::Storage(format!(
                        "order index points at missing commit {}",
                        commit_id
                    )))
                }
            }
        }
        Ok(commits)
    }

    async fn apply(&self, batch: WriteBatch) -> ChangeResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        // Serialize outside the transaction; the closure may retry.
        let put_documents: Vec<(Vec<u8>, Vec<u8>)> = batch
            .put_documents
            .iter()
            .map(|document| {
                Ok((
                    document.id.as_uuid().as_bytes().to_vec(),
                    Self::serialize(document)?,
                ))
            })
            .collect::<ChangeResult<_>>()?;
        let put_commits: Vec<(Vec<u8>, Vec<u8>, Commit)> = batch
            .put_commits
            .iter()
            .map(|commit| {
                Ok((
                    Self::commit_key(&commit.document_id, &commit.id),
                    Self::serialize(commit)?,
                    commit.clone(),
                ))
            })
            .collect::<ChangeResult<_>>()?;
        let deletes: Vec<(Vec<u8>, DocumentId, CommitId)> = batch
            .delete_commits
            .iter()
            .map(|(document_id, commit_id)| {
                (
                    Self::commit_key(document_id, commit_id),
                    *document_id,
                    *commit_id,
                )
            })
            .collect();

        let result = (
            &self.documents,
            &self.commits,
            &self.order_index,
            &self.commit_index,
        )
            .transaction(
                |(documents, commits, order_index, commit_index)| -> ConflictableTransactionResult<(), ChangeError> {
                for (key, document_id, commit_id) in &deletes {
                    if let Some(bytes) = commits.remove(key.as_slice())? {
                        let existing: Commit =
                            serde_json::from_slice(&bytes).map_err(tx_serde)?;
                        order_index.remove(Self::order_key(document_id, existing.order))?;
                        commit_index.remove(commit_id.as_uuid().as_bytes().as_slice())?;
                    }
                }
                for (key, bytes) in &put_documents {
                    documents.insert(key.as_slice(), bytes.as_slice())?;
                }
                for (key, bytes, commit) in &put_commits {
                    // Drop a stale order slot when overwriting a
                    // renumbered commit.
                    if let Some(previous) = commits.insert(key.as_slice(), bytes.as_slice())? {
                        let existing: Commit =
                            serde_json::from_slice(&previous).map_err(tx_serde)?;
                        if existing.order != commit.order {
                            order_index
                                .remove(Self::order_key(&commit.document_id, existing.order))?;
                        }
                    }
                    order_index.insert(
                        Self::order_key(&commit.document_id, commit.order),
                        commit.id.as_uuid().as_bytes().as_slice(),
                    )?;
                    commit_index.insert(
                        commit.id.as_uuid().as_bytes().as_slice(),
                        commit.document_id.as_uuid().as_bytes().as_slice(),
                    )?;
                }
                Ok(())
            },
            );

        result.map_err(|error| match error {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(inner) => storage_error(inner),
        })?;

        if self.flush_on_write {
            self.flush().await?;
        }
        Ok(())
    }
}
