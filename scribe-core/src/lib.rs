//! Scribe Core - Versioned Document History
//!
//! This crate is the commit/change subsystem of a collaborative editing
//! backend. Each document owns an append-only linear chain of commits,
//! and each commit carries a JSON patch describing one edit. The core
//! answers whether a stream of commits from concurrent authors can be
//! linearized onto the existing history, and reports a precise conflict
//! when it cannot.
//!
//! # Architecture
//!
//! - **Types** ([`types`]): `Commit`, `Document`, and their UUID-newtype
//!   identifiers.
//! - **Patch algebra** ([`patch`]): the operation dialect plus apply,
//!   compose, invert, and overlap.
//! - **Validation** ([`validate`]): field validators, single-commit
//!   invariants, and chain validation of ordered batches.
//! - **Squash engine** ([`squash`]): merging adjacent commits, including
//!   the inverse-patch composition and the autosquash policy.
//! - **Conflict resolution** ([`resolve`]): linearizing incoming chains
//!   onto history by rebase or precise rejection.
//! - **History store** ([`history`]): the async persistence contract
//!   implemented by the storage crate.
//! - **Errors** ([`error`]): the Validation / DoesNotExist /
//!   AlreadyExist / Conflict taxonomy.

pub mod error;
pub mod history;
pub mod patch;
pub mod resolve;
pub mod squash;
pub mod types;
pub mod validate;

pub use error::{ChangeError, ChangeResult};
pub use history::HistoryStore;
pub use patch::{
    apply_chain, apply_commit, apply_patch, compose, invert, Patch, PatchOp, Path, Segment,
};
pub use resolve::{overlap, resolve_conflicts};
pub use squash::{autosquash_compatible, do_squash};
pub use types::{id, AsCommitId, Commit, CommitId, Document, DocumentId};
pub use validate::{validate, validate_many};
