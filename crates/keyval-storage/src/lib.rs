//! # keyval Storage Engine
//!
//! Durable, ordered, byte-keyed embedded store backing the keyval record
//! store.
//!
//! This crate is an internal implementation detail; depend on `keyval`
//! instead.
//!
//! ## Architecture
//!
//! ```text
//! put → WAL (disk) → Memtable (memory) ── flush when full ──→ SSTable (disk)
//! get → Memtable → SSTables, newest first
//! ```
//!
//! - **WAL**: every put is logged before it becomes visible
//! - **Memtable**: sorted in-memory write buffer
//! - **SSTable**: immutable sorted table written by each flush; the WAL is
//!   rotated once the table is durable
//!
//! Tables are never merged; compaction is out of scope for this engine.

use keyval_core::{Error, Result};
use keyval_wal::{SyncMode, WalConfig, WalManager, WalRecord};
use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod memtable;
pub mod sstable;

pub use memtable::Memtable;
pub use sstable::{SSTableEntry, SSTableMeta, SSTableReader, SSTableWriter, DEFAULT_BLOCK_SIZE};

/// Default memtable flush threshold (4MB)
const DEFAULT_MEMTABLE_SIZE: u64 = 4 * 1024 * 1024;

const WAL_DIR: &str = "wal";
const SST_DIR: &str = "sst";
const SST_EXT: &str = "sst";
const SST_TMP_EXT: &str = "tmp";

/// Storage engine configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Maximum memtable size before flushing
    pub memtable_size: u64,
    /// Sync mode for WAL
    pub sync_mode: SyncMode,
    /// Target size of SSTable data blocks
    pub block_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            memtable_size: DEFAULT_MEMTABLE_SIZE,
            sync_mode: SyncMode::Sync,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl StorageConfig {
    /// Set the memtable flush threshold
    pub fn with_memtable_size(mut self, bytes: u64) -> Self {
        self.memtable_size = bytes;
        self
    }

    /// Set the WAL sync mode
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }
}

/// An open SSTable. The reader seeks, so lookups serialize per table.
struct Table {
    id: u64,
    meta: SSTableMeta,
    reader: Mutex<SSTableReader>,
}

struct EngineState {
    memtable: Memtable,
    /// Oldest first
    tables: Vec<Arc<Table>>,
    next_table_id: u64,
}

/// Storage engine
///
/// Thread-safe: gets run concurrently with each other and with puts; puts
/// are serialized through the WAL.
pub struct StorageEngine {
    dir: PathBuf,
    config: StorageConfig,
    state: RwLock<EngineState>,
    /// Held across the WAL append and the memtable insert so that log order
    /// and memtable order agree.
    wal: Mutex<WalManager>,
}

impl StorageEngine {
    /// Open or create a storage engine at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, StorageConfig::default())
    }

    /// Open or create a storage engine with custom configuration
    pub fn open_with_config(path: impl AsRef<Path>, config: StorageConfig) -> Result<Self> {
        let dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(dir.join(WAL_DIR))?;
        std::fs::create_dir_all(dir.join(SST_DIR))?;

        let tables = load_tables(&dir.join(SST_DIR))?;
        let next_table_id = tables.last().map_or(1, |t| t.id + 1);

        let mut wal = WalManager::new(WalConfig {
            wal_dir: dir.join(WAL_DIR),
            sync_mode: config.sync_mode,
        });

        let mut memtable = Memtable::new();
        let records = wal.recover()?;
        let replayed = records.len();
        for record in records {
            memtable.put(record.key, record.value);
        }

        wal.open()?;

        info!(
            path = %dir.display(),
            tables = tables.len(),
            replayed,
            "storage engine opened"
        );

        Ok(Self {
            dir,
            config,
            state: RwLock::new(EngineState {
                memtable,
                tables,
                next_table_id,
            }),
            wal: Mutex::new(wal),
        })
    }

    /// Insert or replace the value stored under `key`.
    ///
    /// The write is durable once the WAL append succeeds. A failed automatic
    /// flush is logged and retried by the next put, `flush` or `close`.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut wal = self.wal.lock();
        wal.append(&WalRecord::put(key.to_vec(), value.to_vec()))?;

        let should_flush = {
            let mut state = self.state.write();
            state.memtable.put(key.to_vec(), value.to_vec());
            state.memtable.size_bytes() >= self.config.memtable_size
        };

        if should_flush {
            if let Err(e) = self.flush_locked(&mut wal) {
                warn!(path = %self.dir.display(), error = %e, "automatic memtable flush failed");
            }
        }

        Ok(())
    }

    /// Retrieve a value by key; `None` if the key was never written
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();

        if let Some(value) = state.memtable.get(key) {
            return Ok(Some(value.to_vec()));
        }

        for table in state.tables.iter().rev() {
            if !table.meta.might_contain(key) {
                continue;
            }
            if let Some(value) = table.reader.lock().get(key)? {
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    /// Flush the current memtable to disk as an SSTable
    pub fn flush(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        self.flush_locked(&mut wal)
    }

    // Caller holds the WAL mutex, so the memtable cannot change underneath.
    fn flush_locked(&self, wal: &mut WalManager) -> Result<()> {
        let state = self.state.upgradable_read();
        if state.memtable.is_empty() {
            return Ok(());
        }

        let id = state.next_table_id;
        let sst_dir = self.dir.join(SST_DIR);
        let tmp_path = sst_dir.join(format!("{:016x}.{}", id, SST_TMP_EXT));
        let final_path = sst_dir.join(table_file_name(id));

        // Readers keep using the memtable while the table is written
        let mut writer = SSTableWriter::with_block_size(&tmp_path, self.config.block_size)?;
        for (key, value) in state.memtable.iter() {
            writer.add(key, value)?;
        }
        writer.finish()?;
        std::fs::rename(&tmp_path, &final_path)?;

        let table = open_table(id, &final_path)?;
        let entries = table.meta.entry_count;

        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        state.tables.push(Arc::new(table));
        state.memtable.clear();
        state.next_table_id = id + 1;
        drop(state);

        wal.rotate()?;

        debug!(table = id, entries, "memtable flushed");
        Ok(())
    }

    /// Force logged writes to disk
    pub fn sync(&self) -> Result<()> {
        self.wal.lock().sync()
    }

    /// Get storage statistics
    pub fn stats(&self) -> StorageStats {
        let state = self.state.read();
        StorageStats {
            memtable_size: state.memtable.size_bytes(),
            memtable_entries: state.memtable.len(),
            sstable_count: state.tables.len(),
            total_disk_size: state.tables.iter().map(|t| t.meta.file_size).sum(),
        }
    }

    /// Directory holding the engine's files
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Close the storage engine, flushing buffered writes to an SSTable
    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.wal.lock().close()?;
        info!(path = %self.dir.display(), "storage engine closed");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    /// Current memtable size in bytes
    pub memtable_size: u64,
    /// Number of entries in memtable
    pub memtable_entries: usize,
    /// Total number of SSTables
    pub sstable_count: usize,
    /// Total disk size of SSTables
    pub total_disk_size: u64,
}

fn table_file_name(id: u64) -> String {
    format!("{:016x}.{}", id, SST_EXT)
}

fn open_table(id: u64, path: &Path) -> Result<Table> {
    let reader = SSTableReader::open(path)?;
    Ok(Table {
        id,
        meta: reader.metadata().clone(),
        reader: Mutex::new(reader),
    })
}

/// Open every finished SSTable in `sst_dir`, oldest first.
///
/// Leftover temporary files from an interrupted flush are removed; their
/// contents are still in the WAL.
fn load_tables(sst_dir: &Path) -> Result<Vec<Arc<Table>>> {
    let mut found = Vec::new();

    for entry in std::fs::read_dir(sst_dir)? {
        let path = entry?.path();
        let extension = path.extension().and_then(|e| e.to_str());

        if extension == Some(SST_TMP_EXT) {
            debug!(path = %path.display(), "removing unfinished SSTable");
            std::fs::remove_file(&path)?;
            continue;
        }
        if extension != Some(SST_EXT) {
            continue;
        }

        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| u64::from_str_radix(s, 16).ok())
            .ok_or_else(|| Error::Corruption(format!("Unexpected SSTable name {:?}", path)))?;
        found.push((id, path));
    }

    found.sort_by_key(|(id, _)| *id);

    found
        .into_iter()
        .map(|(id, path)| open_table(id, &path).map(Arc::new))
        .collect()
}
