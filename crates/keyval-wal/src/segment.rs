// WAL segment management - segment discovery, naming, and cleanup
//
// Segments are named: wal-{id:016x}.log
// Where id is a monotonically increasing hex number

use keyval_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Manages WAL segment files
pub struct SegmentManager {
    wal_dir: PathBuf,
}

/// Information about a WAL segment file
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    /// Path to the segment file
    pub path: PathBuf,
    /// Segment id extracted from filename
    pub id: u64,
    /// File size in bytes
    pub size: u64,
}

/// File name for the segment with the given id
pub fn segment_file_name(id: u64) -> String {
    format!("wal-{:016x}.log", id)
}

impl SegmentManager {
    /// Create a new segment manager for the given WAL directory
    pub fn new(wal_dir: PathBuf) -> Self {
        Self { wal_dir }
    }

    /// List all segment files ordered by id
    pub fn list_segments(&self) -> Result<Vec<SegmentInfo>> {
        if !self.wal_dir.exists() {
            return Ok(Vec::new());
        }

        let mut segments: Vec<SegmentInfo> = fs::read_dir(&self.wal_dir)
            .map_err(|e| Error::Storage(format!("Failed to read WAL directory: {}", e)))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_segment_info(&entry.path()))
            .collect();

        segments.sort_by_key(|s| s.id);

        Ok(segments)
    }

    /// Highest segment id on disk, if any
    pub fn latest_id(&self) -> Result<Option<u64>> {
        Ok(self.list_segments()?.last().map(|s| s.id))
    }

    /// Get the total size of all segments
    pub fn total_size(&self) -> Result<u64> {
        Ok(self.list_segments()?.iter().map(|s| s.size).sum())
    }

    /// Get the number of segment files
    pub fn segment_count(&self) -> Result<usize> {
        Ok(self.list_segments()?.len())
    }

    /// Delete every segment whose id is below `id`.
    ///
    /// Returns the number of segments removed.
    pub fn remove_before(&self, id: u64) -> Result<usize> {
        let mut removed = 0;
        for segment in self.list_segments()? {
            if segment.id < id {
                fs::remove_file(&segment.path).map_err(|e| {
                    Error::Storage(format!(
                        "Failed to remove WAL segment {:?}: {}",
                        segment.path, e
                    ))
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn parse_segment_info(path: &Path) -> Option<SegmentInfo> {
    let name = path.file_name()?.to_str()?;
    let id_str = name.strip_prefix("wal-")?.strip_suffix(".log")?;
    let id = u64::from_str_radix(id_str, 16).ok()?;
    let size = fs::metadata(path).ok()?.len();

    Some(SegmentInfo {
        path: path.to_path_buf(),
        id,
        size,
    })
}
