// WAL record format and encoding/decoding
//
// Record frame (binary):
// [length: u32 LE] [payload bytes] [crc32: u32 LE]
//
// The payload is a bincode-encoded `WalRecord`; the CRC covers the payload.

use crc32fast::Hasher;
use keyval_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Size of the length prefix
pub const LENGTH_SIZE: usize = 4;
/// Size of the trailing CRC
pub const CRC_SIZE: usize = 4;
/// Upper bound on a single frame's payload (16 MiB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// A logged write: the key and the exact bytes stored under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Outcome of decoding a frame from the front of a buffer
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A complete, checksum-valid record and the number of bytes it spans
    Record(WalRecord, usize),
    /// The buffer ends before the frame does (torn write at the log tail)
    Incomplete,
}

impl WalRecord {
    /// Create a record for a put of `value` under `key`
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value }
    }

    /// Encode record to bytes with framing and CRC
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidOperation(format!(
                "WAL record too large: {} bytes (max {})",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let mut frame = Vec::with_capacity(LENGTH_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&crc.to_le_bytes());

        Ok(frame)
    }

    /// Decode one frame from the front of `data`.
    ///
    /// A frame cut short by the end of the buffer yields
    /// [`Frame::Incomplete`]; a checksum or payload failure is
    /// [`Error::Corruption`].
    pub fn decode(data: &[u8]) -> Result<Frame> {
        if data.len() < LENGTH_SIZE {
            return Ok(Frame::Incomplete);
        }

        let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if length > MAX_PAYLOAD_SIZE {
            return Err(Error::Corruption(format!(
                "WAL record length too large: {} bytes",
                length
            )));
        }

        let total_size = LENGTH_SIZE + length + CRC_SIZE;
        if data.len() < total_size {
            return Ok(Frame::Incomplete);
        }

        let payload = &data[LENGTH_SIZE..LENGTH_SIZE + length];
        let crc_offset = LENGTH_SIZE + length;
        let expected_crc = u32::from_le_bytes([
            data[crc_offset],
            data[crc_offset + 1],
            data[crc_offset + 2],
            data[crc_offset + 3],
        ]);

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(Error::Corruption(format!(
                "WAL CRC mismatch: expected {}, got {}",
                expected_crc, actual_crc
            )));
        }

        let record: WalRecord = bincode::deserialize(payload)
            .map_err(|e| Error::Corruption(format!("Malformed WAL payload: {}", e)))?;

        Ok(Frame::Record(record, total_size))
    }
}
