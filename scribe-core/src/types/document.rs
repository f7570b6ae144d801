//! Document record
//!
//! A document owns a linear commit chain. Its state value is derived by
//! folding the chain's patches and is never stored independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::DocumentId;

/// A document registered in the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document id (UUIDv4), immutable
    pub id: DocumentId,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document record with a fresh id.
    pub fn new() -> Self {
        Self::with_id(DocumentId::new())
    }

    /// Create a document record for a known id.
    pub fn with_id(id: DocumentId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_id_keeps_id() {
        let id = DocumentId::new();
        let doc = Document::with_id(id);
        assert_eq!(doc.id, id);
    }
}
