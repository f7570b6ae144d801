//! Data model for the versioned-document core

mod commit;
mod common;
mod document;

pub use commit::{id, AsCommitId, Commit};
pub use common::{CommitId, DocumentId};
pub use document::Document;
