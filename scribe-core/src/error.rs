//! Error types for the versioned-document core

use thiserror::Error;

use crate::types::CommitId;

/// Errors produced by the commit/change subsystem.
///
/// The first four variants are the domain taxonomy surfaced to callers;
/// `Storage` and `Serialization` carry infrastructure failures from the
/// persistence layer.
#[derive(Error, Debug)]
pub enum ChangeError {
    /// A structural check failed on a field of an entity.
    #[error("validation failed on {entity}.{field}: expected {expected}, got {got}")]
    Validation {
        entity: &'static str,
        field: &'static str,
        expected: String,
        got: String,
    },

    /// A referenced entity is missing.
    #[error("{entity} does not exist: {id}")]
    DoesNotExist { entity: &'static str, id: String },

    /// A write collided with an existing entity.
    #[error("{entity} already exists: {id}")]
    AlreadyExist { entity: &'static str, id: String },

    /// An incoming commit overlaps an existing history commit and cannot
    /// be rebased.
    #[error("commit {commit_id} conflicts with {conflicts_with}")]
    Conflict {
        commit_id: CommitId,
        conflicts_with: CommitId,
    },

    /// Storage backend failure; the enclosing transaction was rolled back.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for change operations
pub type ChangeResult<T> = Result<T, ChangeError>;

impl ChangeError {
    /// True for the `Conflict` variant.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// True for the `Validation` variant.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
