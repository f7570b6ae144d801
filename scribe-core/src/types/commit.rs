//! Commit record
//!
//! A commit is the unit of history: one recorded edit to a document,
//! linked to its predecessor through `previous_commit_id`. Commits of a
//! document form a single linear chain from the root (no predecessor) to
//! the tip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::common::{CommitId, DocumentId};
use crate::patch::Patch;

/// A single recorded edit in a document's history.
///
/// `order` and `reverse_patch` are autogenerated at write time; their
/// values on an in-flight commit are placeholders and are overwritten by
/// the store when the commit is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Globally unique commit id (UUIDv4)
    pub id: CommitId,
    /// Predecessor in the chain; `None` marks the chain root
    pub previous_commit_id: Option<CommitId>,
    /// Document this commit belongs to
    pub document_id: DocumentId,
    /// Position in the document's history, dense from 0 at the root
    #[serde(default)]
    pub order: u64,
    /// Eligible for automatic squashing with an adjacent compatible commit
    #[serde(default)]
    pub autosquash: bool,
    /// Forward edit
    pub patch: Patch,
    /// Patch undoing `patch` against the state just before this commit
    #[serde(default)]
    pub reverse_patch: Patch,
    /// Opaque author-supplied metadata
    #[serde(default)]
    pub meta: Value,
    /// Timestamp of the last squash or rewrite
    pub updated_at: DateTime<Utc>,
}

impl Commit {
    /// Create a new in-flight commit with a fresh id.
    pub fn new(document_id: DocumentId, previous_commit_id: Option<CommitId>, patch: Patch) -> Self {
        Self {
            id: CommitId::new(),
            previous_commit_id,
            document_id,
            order: 0,
            autosquash: false,
            patch,
            reverse_patch: Patch::default(),
            meta: Value::Null,
            updated_at: Utc::now(),
        }
    }

    /// Set the autosquash flag.
    pub fn with_autosquash(mut self, autosquash: bool) -> Self {
        self.autosquash = autosquash;
        self
    }

    /// Attach author metadata.
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }

    /// True when this commit is the root of its chain.
    pub fn is_root(&self) -> bool {
        self.previous_commit_id.is_none()
    }
}

/// Anything that can be coerced to a commit id: a commit, a commit id, or
/// a bare UUID.
pub trait AsCommitId {
    fn commit_id(&self) -> CommitId;
}

impl AsCommitId for Commit {
    fn commit_id(&self) -> CommitId {
        self.id
    }
}

impl AsCommitId for &Commit {
    fn commit_id(&self) -> CommitId {
        self.id
    }
}

impl AsCommitId for CommitId {
    fn commit_id(&self) -> CommitId {
        *self
    }
}

impl AsCommitId for &CommitId {
    fn commit_id(&self) -> CommitId {
        **self
    }
}

impl AsCommitId for Uuid {
    fn commit_id(&self) -> CommitId {
        CommitId(*self)
    }
}

/// Identity coercion: the commit id of a commit, or the id itself.
pub fn id<T: AsCommitId>(value: T) -> CommitId {
    value.commit_id()
}
