//! Store configuration

use serde::{Deserialize, Serialize};

/// Configuration for opening a history store.
///
/// An empty `data_dir` selects the in-memory backend; anything else is a
/// sled database directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Data directory; empty for in-memory storage
    pub data_dir: String,
    /// Flush sled to disk after every applied batch
    pub flush_on_write: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: "./scribe_data".to_string(),
            flush_on_write: true,
        }
    }
}

impl StoreConfig {
    /// Development configuration: local directory, no per-write flush.
    pub fn development() -> Self {
        Self {
            data_dir: "./scribe_dev_data".to_string(),
            flush_on_write: false,
        }
    }

    /// Test configuration: in-memory storage.
    pub fn test() -> Self {
        Self {
            data_dir: String::new(),
            flush_on_write: false,
        }
    }

    /// True when this configuration selects the in-memory backend.
    pub fn is_in_memory(&self) -> bool {
        self.data_dir.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_config_is_in_memory() {
        assert!(StoreConfig::test().is_in_memory());
        assert!(!StoreConfig::default().is_in_memory());
    }
}
