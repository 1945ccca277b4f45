//! # keyval WAL (Write-Ahead Log)
//!
//! Write-ahead log for the keyval storage engine: every put is framed,
//! checksummed and appended here before it becomes visible in the memtable.
//!
//! This crate is an internal implementation detail; depend on `keyval`
//! instead.
//!
//! ## Lifecycle
//!
//! ```text
//! open()   -> new segment after the newest one on disk
//! append() -> frame + CRC, synced per SyncMode
//! rotate() -> new segment, older segments deleted (after a memtable flush)
//! ```

use keyval_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

pub mod reader;
pub mod record;
pub mod recovery;
pub mod segment;
pub mod writer;

pub use reader::WalReader;
pub use record::{Frame, WalRecord};
pub use recovery::{RecoveryManager, RecoveryStats};
pub use segment::{SegmentInfo, SegmentManager};
pub use writer::WalWriter;

/// WAL configuration options
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Sync mode: sync, async, or none
    pub sync_mode: SyncMode,
    /// Directory path for WAL segments
    pub wal_dir: PathBuf,
}

impl WalConfig {
    /// Configuration for a WAL in `wal_dir` with the default sync mode
    pub fn new(wal_dir: impl Into<PathBuf>) -> Self {
        Self {
            wal_dir: wal_dir.into(),
            ..Default::default()
        }
    }

    /// Set the sync mode
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Sync,
            wal_dir: PathBuf::from("wal"),
        }
    }
}

/// Sync mode for WAL writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Call fsync after every write (strongest durability)
    Sync,
    /// Hand every write to the OS, fsync only on explicit sync or rotation
    Async,
    /// Buffer writes in process (fastest, unsafe for crashes)
    None,
}

/// WAL manager coordinates log writing, rotation and recovery
pub struct WalManager {
    config: WalConfig,
    writer: Option<WalWriter>,
}

impl WalManager {
    pub fn new(config: WalConfig) -> Self {
        Self {
            config,
            writer: None,
        }
    }

    /// Open the WAL for writing
    ///
    /// Writes always go to a fresh segment so that a torn tail left by a
    /// crash never sits in front of new records.
    pub fn open(&mut self) -> Result<()> {
        let next_id = self.segment_manager().latest_id()?.map_or(1, |id| id + 1);
        let writer = WalWriter::new(&self.config.wal_dir, next_id, self.config.sync_mode)?;
        debug!(segment = next_id, "WAL opened");
        self.writer = Some(writer);
        Ok(())
    }

    fn writer_mut(&mut self) -> Result<&mut WalWriter> {
        self.writer
            .as_mut()
            .ok_or_else(|| Error::InvalidOperation("WAL not opened".to_string()))
    }

    /// Append a record to the WAL
    pub fn append(&mut self, record: &WalRecord) -> Result<u64> {
        self.writer_mut()?.append(record)
    }

    /// Sync the WAL to disk
    pub fn sync(&mut self) -> Result<()> {
        match &mut self.writer {
            Some(writer) => writer.sync(),
            None => Ok(()),
        }
    }

    /// Start a new segment and delete every older one.
    ///
    /// Call only once the records in the older segments are durable
    /// elsewhere (flushed to a sorted table).
    pub fn rotate(&mut self) -> Result<()> {
        let current = self.writer_mut()?;
        current.sync()?;
        let next_id = current.segment_id() + 1;

        let writer = WalWriter::new(&self.config.wal_dir, next_id, self.config.sync_mode)?;
        self.writer = Some(writer);

        let removed = self.segment_manager().remove_before(next_id)?;
        debug!(segment = next_id, removed, "WAL rotated");
        Ok(())
    }

    /// Close the WAL
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.sync()?;
        }
        Ok(())
    }

    /// Recover records from the WAL
    pub fn recover(&self) -> Result<Vec<WalRecord>> {
        RecoveryManager::new(self.config.clone()).recover()
    }

    /// Get statistics about the WAL
    pub fn stats(&self) -> Result<RecoveryStats> {
        RecoveryManager::new(self.config.clone()).get_stats()
    }

    /// Get a segment manager for the WAL
    pub fn segment_manager(&self) -> SegmentManager {
        SegmentManager::new(self.config.wal_dir.clone())
    }

    /// Get the current configuration
    pub fn config(&self) -> &WalConfig {
        &self.config
    }

    /// Check if the WAL is open for writing
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_config() -> (TempDir, WalConfig) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = WalConfig::new(temp_dir.path().join("wal"));
        (temp_dir, config)
    }

    #[test]
    fn test_wal_config_default() {
        let config = WalConfig::default();
        assert_eq!(config.sync_mode, SyncMode::Sync);
        let config = config.with_sync_mode(SyncMode::Async);
        assert_eq!(config.sync_mode, SyncMode::Async);
    }

    #[test]
    fn test_wal_manager_lifecycle() {
        let (_temp_dir, config) = setup_test_config();

        let mut manager = WalManager::new(config);
        assert!(!manager.is_open());
        assert!(manager
            .append(&WalRecord::put(b"k".to_vec(), b"v".to_vec()))
            .is_err());

        manager.open().expect("Failed to open");
        assert!(manager.is_open());

        manager.close().expect("Failed to close");
        assert!(!manager.is_open());
    }

    #[test]
    fn test_open_starts_new_segment() {
        let (_temp_dir, config) = setup_test_config();

        for _ in 0..3 {
            let mut manager = WalManager::new(config.clone());
            manager.open().expect("Failed to open");
            manager
                .append(&WalRecord::put(b"k".to_vec(), b"v".to_vec()))
                .expect("Failed to append");
            manager.close().expect("Failed to close");
        }

        let manager = WalManager::new(config);
        let ids: Vec<u64> = manager
            .segment_manager()
            .list_segments()
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(manager.recover().unwrap().len(), 3);
    }

    #[test]
    fn test_rotate_discards_older_segments() {
        let (_temp_dir, config) = setup_test_config();

        let mut manager = WalManager::new(config);
        manager.open().expect("Failed to open");
        for i in 0..5 {
            manager
                .append(&WalRecord::put(format!("key{}", i).into_bytes(), b"v".to_vec()))
                .expect("Failed to append");
        }

        manager.rotate().expect("Failed to rotate");
        manager
            .append(&WalRecord::put(b"after".to_vec(), b"v".to_vec()))
            .expect("Failed to append");

        assert_eq!(manager.segment_manager().segment_count().unwrap(), 1);
        let records = manager.recover().unwrap();
        assert_eq!(records, vec![WalRecord::put(b"after".to_vec(), b"v".to_vec())]);
    }

    #[test]
    fn test_wal_manager_stats() {
        let (_temp_dir, config) = setup_test_config();

        let mut manager = WalManager::new(config);
        manager.open().expect("Failed to open");
        manager
            .append(&WalRecord::put(b"k".to_vec(), b"v".to_vec()))
            .expect("Failed");
        manager.sync().expect("Failed to sync");

        let stats = manager.stats().expect("Failed to get stats");
        assert_eq!(stats.segment_count, 1);
        assert_eq!(stats.total_records, 1);
    }
}
