//! File format versions for keyval
//!
//! Version constants and magic numbers for the on-disk formats, so readers
//! can reject data they do not understand.

/// Sorted table format version
pub const SSTABLE_FORMAT_VERSION: u16 = 1;

/// Record codec format version (stored as the first byte of every value)
pub const RECORD_FORMAT_VERSION: u8 = 1;

/// Magic numbers for file validation
pub mod magic {
    /// Sorted table magic: "KVST"
    pub const SSTABLE: u64 = 0x4B56_5354_0000_0001;
}

/// Version compatibility information
pub struct FormatVersion {
    /// Current version of this format
    pub current: u16,
    /// Minimum supported version for reading
    pub min_read: u16,
}

impl FormatVersion {
    /// Check if a version can be read
    pub fn can_read(&self, version: u16) -> bool {
        version >= self.min_read && version <= self.current
    }
}

/// Sorted table format version info
pub fn sstable_version() -> FormatVersion {
    FormatVersion {
        current: SSTABLE_FORMAT_VERSION,
        min_read: 1,
    }
}
