//! SSTable - Sorted String Table format and I/O
//!
//! SSTables are immutable on-disk files that store key-value pairs in sorted
//! order. Each memtable flush produces one.
//!
//! ## File Format
//!
//! ```text
//! +------------------+
//! | Data Blocks      |  <- length-prefixed entries, CRC32 after each block
//! +------------------+
//! | Index Block      |  <- first key + offset + size of every data block
//! +------------------+
//! | Footer           |  <- version, index location, key range, magic, CRC
//! +------------------+
//! | Footer length    |  <- u32 LE
//! +------------------+
//! ```

use keyval_core::format_version::{magic, sstable_version, SSTABLE_FORMAT_VERSION};
use keyval_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Default block size (4KB)
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// A single key-value pair in an SSTable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SSTableEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Index entry pointing to a data block
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    /// First key in the block
    first_key: Vec<u8>,
    /// Offset of the block in the file
    offset: u64,
    /// Size of the block in bytes, CRC included
    size: u32,
}

/// SSTable footer containing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SSTableFooter {
    version: u16,
    index_offset: u64,
    index_size: u32,
    entry_count: u64,
    min_key: Vec<u8>,
    max_key: Vec<u8>,
    magic: u64,
    /// CRC32 of the footer encoded with this field set to zero
    crc: u32,
}

impl SSTableFooter {
    fn checksum(&self) -> Result<u32> {
        let unsealed = SSTableFooter {
            crc: 0,
            ..self.clone()
        };
        Ok(crc32fast::hash(&bincode::serialize(&unsealed)?))
    }
}

/// SSTable metadata (in-memory representation)
#[derive(Debug, Clone)]
pub struct SSTableMeta {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Minimum key
    pub min_key: Vec<u8>,
    /// Maximum key
    pub max_key: Vec<u8>,
    /// Number of entries
    pub entry_count: u64,
    /// File size in bytes
    pub file_size: u64,
}

impl SSTableMeta {
    /// Check if a key falls inside this table's key range
    pub fn might_contain(&self, key: &[u8]) -> bool {
        self.entry_count > 0 && key >= self.min_key.as_slice() && key <= self.max_key.as_slice()
    }
}

/// SSTable writer - creates new SSTable files
pub struct SSTableWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// Current position in file
    position: u64,
    index: Vec<IndexEntry>,
    block_buffer: Vec<u8>,
    block_size: usize,
    current_block_first_key: Option<Vec<u8>>,
    entry_count: u64,
    min_key: Option<Vec<u8>>,
    max_key: Option<Vec<u8>>,
}

impl SSTableWriter {
    /// Create a new SSTable writer
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_block_size(path, DEFAULT_BLOCK_SIZE)
    }

    /// Create a new SSTable writer with custom block size
    pub fn with_block_size(path: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            position: 0,
            index: Vec::new(),
            block_buffer: Vec::with_capacity(block_size),
            block_size: block_size.max(1),
            current_block_first_key: None,
            entry_count: 0,
            min_key: None,
            max_key: None,
        })
    }

    /// Add an entry; keys must arrive in strictly increasing order
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if let Some(max) = &self.max_key {
            if key <= max.as_slice() {
                return Err(Error::InvalidOperation(
                    "SSTable keys must be added in strictly increasing order".into(),
                ));
            }
        }

        if self.min_key.is_none() {
            self.min_key = Some(key.to_vec());
        }
        self.max_key = Some(key.to_vec());

        if self.current_block_first_key.is_none() {
            self.current_block_first_key = Some(key.to_vec());
        }

        let encoded = bincode::serialize(&SSTableEntry {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;

        self.block_buffer
            .extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        self.block_buffer.extend_from_slice(&encoded);
        self.entry_count += 1;

        if self.block_buffer.len() >= self.block_size {
            self.flush_block()?;
        }

        Ok(())
    }

    /// Flush the current block to disk
    fn flush_block(&mut self) -> Result<()> {
        if self.block_buffer.is_empty() {
            return Ok(());
        }

        let crc = crc32fast::hash(&self.block_buffer);

        if let Some(first_key) = self.current_block_first_key.take() {
            self.index.push(IndexEntry {
                first_key,
                offset: self.position,
                size: self.block_buffer.len() as u32 + 4,
            });
        }

        self.writer.write_all(&self.block_buffer)?;
        self.writer.write_all(&crc.to_le_bytes())?;
        self.position += self.block_buffer.len() as u64 + 4;

        self.block_buffer.clear();

        Ok(())
    }

    /// Finish writing, fsync the file and return its metadata
    pub fn finish(mut self) -> Result<SSTableMeta> {
        self.flush_block()?;

        let index_offset = self.position;
        let index_encoded = bincode::serialize(&self.index)?;
        self.writer.write_all(&index_encoded)?;
        self.position += index_encoded.len() as u64;

        let min_key = self.min_key.take().unwrap_or_default();
        let max_key = self.max_key.take().unwrap_or_default();

        let mut footer = SSTableFooter {
            version: SSTABLE_FORMAT_VERSION,
            index_offset,
            index_size: index_encoded.len() as u32,
            entry_count: self.entry_count,
            min_key: min_key.clone(),
            max_key: max_key.clone(),
            magic: magic::SSTABLE,
            crc: 0,
        };
        footer.crc = footer.checksum()?;

        let footer_encoded = bincode::serialize(&footer)?;
        self.writer.write_all(&footer_encoded)?;
        self.writer
            .write_all(&(footer_encoded.len() as u32).to_le_bytes())?;
        self.position += footer_encoded.len() as u64 + 4;

        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;

        Ok(SSTableMeta {
            path: self.path,
            min_key,
            max_key,
            entry_count: self.entry_count,
            file_size: self.position,
        })
    }
}

/// SSTable reader - point lookups against an existing SSTable file
pub struct SSTableReader {
    file: BufReader<File>,
    index: Vec<IndexEntry>,
    meta: SSTableMeta,
}

impl SSTableReader {
    /// Open an SSTable file, validating its footer
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_size = file.metadata()?.len();

        if file_size < 4 {
            return Err(Error::Corruption(format!("SSTable {:?} too small", path)));
        }

        file.seek(SeekFrom::End(-4))?;
        let mut footer_len_buf = [0u8; 4];
        file.read_exact(&mut footer_len_buf)?;
        let footer_len = u32::from_le_bytes(footer_len_buf) as u64;

        if footer_len + 4 > file_size {
            return Err(Error::Corruption(format!(
                "SSTable {:?} footer length {} exceeds file size",
                path, footer_len
            )));
        }

        file.seek(SeekFrom::Start(file_size - 4 - footer_len))?;
        let mut footer_buf = vec![0u8; footer_len as usize];
        file.read_exact(&mut footer_buf)?;

        let footer: SSTableFooter = bincode::deserialize(&footer_buf)
            .map_err(|e| Error::Corruption(format!("SSTable {:?} footer: {}", path, e)))?;

        if footer.magic != magic::SSTABLE {
            return Err(Error::Corruption(format!(
                "Invalid SSTable magic number in {:?}",
                path
            )));
        }
        if !sstable_version().can_read(footer.version) {
            return Err(Error::Corruption(format!(
                "Unsupported SSTable version {} in {:?}",
                footer.version, path
            )));
        }
        if footer.checksum()? != footer.crc {
            return Err(Error::Corruption(format!(
                "SSTable {:?} footer CRC mismatch",
                path
            )));
        }

        let index_end = footer
            .index_offset
            .checked_add(footer.index_size as u64)
            .ok_or_else(|| {
                Error::Corruption(format!("SSTable {:?} index range overflows", path))
            })?;
        if index_end > file_size - 4 - footer_len {
            return Err(Error::Corruption(format!(
                "SSTable {:?} index out of bounds",
                path
            )));
        }

        file.seek(SeekFrom::Start(footer.index_offset))?;
        let mut index_buf = vec![0u8; footer.index_size as usize];
        file.read_exact(&mut index_buf)?;

        let index: Vec<IndexEntry> = bincode::deserialize(&index_buf)
            .map_err(|e| Error::Corruption(format!("SSTable {:?} index: {}", path, e)))?;

        Ok(Self {
            file: BufReader::new(file),
            index,
            meta: SSTableMeta {
                path,
                min_key: footer.min_key,
                max_key: footer.max_key,
                entry_count: footer.entry_count,
                file_size,
            },
        })
    }

    /// Get a value by key
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if !self.meta.might_contain(key) {
            return Ok(None);
        }

        // The candidate block is the last one whose first key is <= key
        let block_idx = self
            .index
            .partition_point(|entry| entry.first_key.as_slice() <= key);
        if block_idx == 0 {
            return Ok(None);
        }

        for entry in self.read_block(block_idx - 1)? {
            if entry.key.as_slice() == key {
                return Ok(Some(entry.value));
            }
            if entry.key.as_slice() > key {
                break;
            }
        }

        Ok(None)
    }

    /// Read every entry in key order
    pub fn entries(&mut self) -> Result<Vec<SSTableEntry>> {
        let mut entries = Vec::with_capacity(self.meta.entry_count as usize);
        for block_idx in 0..self.index.len() {
            entries.extend(self.read_block(block_idx)?);
        }
        Ok(entries)
    }

    /// Read and verify a data block by index
    fn read_block(&mut self, block_idx: usize) -> Result<Vec<SSTableEntry>> {
        let index_entry = &self.index[block_idx];
        if index_entry.size < 4 {
            return Err(Error::Corruption("SSTable block too small".into()));
        }

        self.file.seek(SeekFrom::Start(index_entry.offset))?;

        let mut data_buf = vec![0u8; index_entry.size as usize - 4];
        self.file.read_exact(&mut data_buf)?;

        let mut crc_buf = [0u8; 4];
        self.file.read_exact(&mut crc_buf)?;
        if u32::from_le_bytes(crc_buf) != crc32fast::hash(&data_buf) {
            return Err(Error::Corruption("Block CRC mismatch".into()));
        }

        let mut entries = Vec::new();
        let mut offset = 0;

        while offset + 4 <= data_buf.len() {
            let len = u32::from_le_bytes([
                data_buf[offset],
                data_buf[offset + 1],
                data_buf[offset + 2],
                data_buf[offset + 3],
            ]) as usize;
            offset += 4;

            if offset + len > data_buf.len() {
                return Err(Error::Corruption("SSTable entry overruns block".into()));
            }

            let entry: SSTableEntry = bincode::deserialize(&data_buf[offset..offset + len])
                .map_err(|e| Error::Corruption(format!("SSTable entry: {}", e)))?;
            entries.push(entry);
            offset += len;
        }

        Ok(entries)
    }

    /// Get metadata about this SSTable
    pub fn metadata(&self) -> &SSTableMeta {
        &self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_table(path: &Path, block_size: usize, count: usize) -> SSTableMeta {
        let mut writer = SSTableWriter::with_block_size(path, block_size).unwrap();
        for i in 0..count {
            writer
                .add(
                    format!("key{:04}", i).as_bytes(),
                    format!("value{}", i).as_bytes(),
                )
                .unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sst");

        let meta = write_table(&path, DEFAULT_BLOCK_SIZE, 3);
        assert_eq!(meta.entry_count, 3);
        assert_eq!(meta.min_key, b"key0000");
        assert_eq!(meta.max_key, b"key0002");
        assert_eq!(meta.file_size, std::fs::metadata(&path).unwrap().len());

        let mut reader = SSTableReader::open(&path).unwrap();
        assert_eq!(reader.get(b"key0001").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(reader.get(b"key0009").unwrap(), None);
        assert_eq!(reader.get(b"aaa").unwrap(), None);
    }

    #[test]
    fn test_many_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocks.sst");

        write_table(&path, 64, 500);

        let mut reader = SSTableReader::open(&path).unwrap();
        for i in (0..500).step_by(37) {
            let key = format!("key{:04}", i);
            assert_eq!(
                reader.get(key.as_bytes()).unwrap(),
                Some(format!("value{}", i).into_bytes()),
                "missing {}",
                key
            );
        }
        assert_eq!(reader.get(b"key0100x").unwrap(), None);
        assert_eq!(reader.entries().unwrap().len(), 500);
    }

    #[test]
    fn test_empty_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.sst");

        let meta = write_table(&path, DEFAULT_BLOCK_SIZE, 0);
        assert!(!meta.might_contain(b""));

        let mut reader = SSTableReader::open(&path).unwrap();
        assert_eq!(reader.get(b"").unwrap(), None);
    }

    #[test]
    fn test_rejects_unsorted_keys() {
        let dir = tempdir().unwrap();
        let mut writer = SSTableWriter::new(dir.path().join("bad.sst")).unwrap();
        writer.add(b"b", b"1").unwrap();
        assert!(writer.add(b"a", b"2").is_err());
        assert!(writer.add(b"b", b"3").is_err());
    }

    #[test]
    fn test_detects_corrupt_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.sst");
        write_table(&path, DEFAULT_BLOCK_SIZE, 10);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[8] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let mut reader = SSTableReader::open(&path).unwrap();
        assert!(matches!(
            reader.get(b"key0000"),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_detects_bad_footer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.sst");
        std::fs::write(&path, b"definitely not a table").unwrap();

        assert!(SSTableReader::open(&path).is_err());
    }

    #[test]
    fn test_rejects_overflowing_index_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("overflow.sst");

        let mut footer = SSTableFooter {
            version: SSTABLE_FORMAT_VERSION,
            index_offset: u64::MAX,
            index_size: 16,
            entry_count: 0,
            min_key: Vec::new(),
            max_key: Vec::new(),
            magic: magic::SSTABLE,
            crc: 0,
        };
        footer.crc = footer.checksum().unwrap();

        let mut bytes = bincode::serialize(&footer).unwrap();
        let footer_len = bytes.len() as u32;
        bytes.extend_from_slice(&footer_len.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            SSTableReader::open(&path),
            Err(Error::Corruption(_))
        ));
    }
}
