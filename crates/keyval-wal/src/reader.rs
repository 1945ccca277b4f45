// WAL reader module - reads and replays log records
//
// The reader handles:
// 1. Segment discovery - finding all WAL segment files in id order
// 2. Record reading - decoding frames from each segment in turn
// 3. Tail handling - a torn or checksum-failing frame ends its segment

use crate::record::{Frame, WalRecord};
use crate::segment::SegmentManager;
use keyval_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// WAL reader for reading records from log segments
pub struct WalReader {
    /// Segment file paths ordered by id
    segments: Vec<PathBuf>,
    /// Index of the next segment to load
    next_segment: usize,
    /// Contents of the segment being read
    buffer: Vec<u8>,
    /// Current byte offset within `buffer`
    offset: usize,
    /// Segments whose tail could not be decoded
    torn_segments: usize,
}

impl WalReader {
    /// Create a new WAL reader for the given WAL directory
    pub fn new(wal_dir: &Path) -> Result<Self> {
        let segments = SegmentManager::new(wal_dir.to_path_buf())
            .list_segments()?
            .into_iter()
            .map(|s| s.path)
            .collect();

        Ok(Self {
            segments,
            next_segment: 0,
            buffer: Vec::new(),
            offset: 0,
            torn_segments: 0,
        })
    }

    /// Load the next segment into the buffer; `false` once all are read
    fn advance_segment(&mut self) -> Result<bool> {
        let Some(path) = self.segments.get(self.next_segment) else {
            self.buffer.clear();
            self.offset = 0;
            return Ok(false);
        };

        self.buffer = std::fs::read(path)
            .map_err(|e| Error::Storage(format!("Failed to open segment {:?}: {}", path, e)))?;
        self.offset = 0;
        self.next_segment += 1;
        Ok(true)
    }

    /// Read the next record from the WAL
    ///
    /// Returns `Ok(Some(record))` if a record was read successfully and
    /// `Ok(None)` once every segment is exhausted. Bytes after a torn or
    /// corrupt frame in a segment are skipped.
    pub fn next_record(&mut self) -> Result<Option<WalRecord>> {
        loop {
            if self.offset >= self.buffer.len() {
                if !self.advance_segment()? {
                    return Ok(None);
                }
                continue;
            }

            match WalRecord::decode(&self.buffer[self.offset..]) {
                Ok(Frame::Record(record, size)) => {
                    self.offset += size;
                    return Ok(Some(record));
                }
                Ok(Frame::Incomplete) => {
                    warn!(
                        segment = self.next_segment - 1,
                        dropped_bytes = self.buffer.len() - self.offset,
                        "ignoring torn WAL tail"
                    );
                    self.skip_rest_of_segment();
                }
                Err(Error::Corruption(msg)) => {
                    warn!(
                        segment = self.next_segment - 1,
                        offset = self.offset,
                        error = %msg,
                        "ignoring corrupt WAL tail"
                    );
                    self.skip_rest_of_segment();
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn skip_rest_of_segment(&mut self) {
        self.torn_segments += 1;
        self.offset = self.buffer.len();
    }

    /// Get the number of segments discovered
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of segments read so far whose tail was discarded
    pub fn torn_segments(&self) -> usize {
        self.torn_segments
    }

    /// Read all remaining records into a vector
    pub fn read_all(&mut self) -> Result<Vec<WalRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }
}

/// Iterator implementation for WalReader
impl Iterator for WalReader {
    type Item = Result<WalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
