// WAL recovery module - handles crash recovery logic
//
// Recovery reads every segment in id order and returns the logged puts for
// replay. A torn or corrupt tail ends its segment; everything before it is
// kept.

use crate::{WalConfig, WalReader, WalRecord};
use keyval_core::Result;
use tracing::debug;

/// Manages WAL recovery after crash or restart
pub struct RecoveryManager {
    config: WalConfig,
}

impl RecoveryManager {
    /// Create a new recovery manager with the given configuration
    pub fn new(config: WalConfig) -> Self {
        Self { config }
    }

    /// Recover records from the WAL, oldest first
    pub fn recover(&self) -> Result<Vec<WalRecord>> {
        let mut reader = WalReader::new(&self.config.wal_dir)?;
        let records = reader.read_all()?;

        debug!(
            segments = reader.segment_count(),
            records = records.len(),
            torn_segments = reader.torn_segments(),
            "WAL recovery complete"
        );

        Ok(records)
    }

    /// Get statistics about the WAL
    pub fn get_stats(&self) -> Result<RecoveryStats> {
        let mut reader = WalReader::new(&self.config.wal_dir)?;
        let total_records = reader.read_all()?.len();

        Ok(RecoveryStats {
            segment_count: reader.segment_count(),
            total_records,
            torn_segments: reader.torn_segments(),
        })
    }
}

/// Statistics about the WAL state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Number of segment files
    pub segment_count: usize,
    /// Total number of readable records
    pub total_records: usize,
    /// Segments whose tail was discarded
    pub torn_segments: usize,
}
