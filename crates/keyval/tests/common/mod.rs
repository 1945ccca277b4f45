// Common test utilities for record store integration tests

use keyval::{KeyVal, KeyValConfig, StorageConfig};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture that owns a scratch directory for one store
pub struct StoreFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub storage_path: PathBuf,
    pub content_path: PathBuf,
}

impl StoreFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage_path = temp_dir.path().join("kv");
        let content_path = temp_dir.path().join("content");

        Self {
            temp_dir,
            storage_path,
            content_path,
        }
    }

    pub fn config(&self, soft_delete: bool) -> KeyValConfig {
        KeyValConfig::new(self.storage_path.clone())
            .with_content_path(self.content_path.clone())
            .with_soft_delete(soft_delete)
    }

    pub fn open(&self, soft_delete: bool) -> KeyVal {
        KeyVal::open(self.config(soft_delete)).expect("Failed to open store")
    }

    /// Open with a memtable small enough that a handful of puts flush
    #[allow(dead_code)]
    pub fn open_small_memtable(&self, soft_delete: bool) -> KeyVal {
        let storage = StorageConfig::default().with_memtable_size(256);
        KeyVal::open(self.config(soft_delete).with_storage(storage)).expect("Failed to open store")
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}
