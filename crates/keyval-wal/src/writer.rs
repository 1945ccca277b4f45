// WAL writer module - handles appending records to one segment
use crate::record::WalRecord;
use crate::segment::segment_file_name;
use crate::SyncMode;
use keyval_core::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct WalWriter {
    file: BufWriter<File>,
    path: PathBuf,
    segment_id: u64,
    size: u64,
    sync_mode: SyncMode,
    records: u64,
}

impl WalWriter {
    /// Open (or create) segment `segment_id` in `wal_dir` for appending.
    pub fn new(wal_dir: &Path, segment_id: u64, sync_mode: SyncMode) -> Result<Self> {
        std::fs::create_dir_all(wal_dir)
            .map_err(|e| Error::Storage(format!("Failed to create WAL directory: {}", e)))?;

        let path = wal_dir.join(segment_file_name(segment_id));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::Storage(format!("Failed to open WAL segment: {}", e)))?;

        let size = file
            .metadata()
            .map_err(|e| Error::Storage(format!("Failed to stat WAL segment: {}", e)))?
            .len();

        Ok(Self {
            file: BufWriter::new(file),
            path,
            segment_id,
            size,
            sync_mode,
            records: 0,
        })
    }

    /// Append a record, honouring the sync mode.
    ///
    /// Returns the number of records appended through this writer.
    pub fn append(&mut self, record: &WalRecord) -> Result<u64> {
        let encoded = record.encode()?;

        self.file
            .write_all(&encoded)
            .map_err(|e| Error::Storage(format!("Failed to write WAL record: {}", e)))?;

        self.size += encoded.len() as u64;
        self.records += 1;

        match self.sync_mode {
            SyncMode::Sync => self.sync()?,
            SyncMode::Async => self
                .file
                .flush()
                .map_err(|e| Error::Storage(format!("Failed to flush WAL: {}", e)))?,
            SyncMode::None => {}
        }

        Ok(self.records)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| Error::Storage(format!("Failed to flush WAL: {}", e)))?;

        self.file
            .get_ref()
            .sync_all()
            .map_err(|e| Error::Storage(format!("Failed to sync WAL: {}", e)))?;

        Ok(())
    }

    /// Path of the segment being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Id of the segment being written
    pub fn segment_id(&self) -> u64 {
        self.segment_id
    }

    /// Segment size in bytes, including buffered data
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for WalWriter {
    fn drop(&mut self) {
        // Best effort sync on drop
        let _ = self.sync();
    }
}
