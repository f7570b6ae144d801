//! Scribe Store - History Persistence
//!
//! Storage layer for the scribe versioned-document core. Provides the
//! concrete [`HistoryStore`](scribe_core::HistoryStore) implementation:
//!
//! - **Backends** ([`backend`]): record storage behind the
//!   `HistoryBackend` trait, with an in-memory implementation for tests
//!   and development and a sled implementation for persistence.
//! - **Batches** ([`batch`]): the atomic all-or-nothing mutation unit.
//! - **Service** ([`service`]): `HistoryService`, which validates,
//!   resolves conflicts, assigns orders, computes reverse patches, and
//!   applies the autosquash policy, serializing writers so every
//!   operation runs as one transaction.
//! - **Configuration** ([`config`]): store settings with development and
//!   test presets.

pub mod backend;
pub mod batch;
pub mod config;
pub mod service;

pub use backend::{HistoryBackend, MemoryBackend, SledBackend};
pub use batch::WriteBatch;
pub use config::StoreConfig;
pub use service::HistoryService;
