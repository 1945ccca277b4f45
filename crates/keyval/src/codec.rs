//! Record codec
//!
//! Deterministic binary encoding of [`Record`] values as persisted in the
//! storage engine.
//!
//! ## Format (version 1)
//!
//! ```text
//! +---------+-------+-------------+-------------------+
//! | version | state | payload_len | payload (UTF-8)   |
//! | u8      | u8    | u32 LE      | payload_len bytes |
//! +---------+-------+-------------+-------------------+
//! ```
//!
//! The encoding is exact: a value must be precisely `HEADER_LEN +
//! payload_len` bytes long.

use crate::record::{DeletionState, Record};
use keyval_core::format_version::RECORD_FORMAT_VERSION;
use thiserror::Error;

/// Bytes before the payload
pub const HEADER_LEN: usize = 6;

/// Largest payload the codec accepts (1 MiB)
pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

/// A record that cannot be represented in the wire format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Bytes that are not a valid encoded record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("record has trailing bytes: expected {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },

    #[error("unsupported record format version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown deletion state tag {0}")]
    UnknownState(u8),

    #[error("declared payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Encode a record to its stored byte form
pub fn encode(record: &Record) -> Result<Vec<u8>, EncodeError> {
    let payload = record.payload.as_bytes();
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push(RECORD_FORMAT_VERSION);
    buf.push(record.deleted.tag());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Decode a record from its stored byte form
pub fn decode(data: &[u8]) -> Result<Record, DecodeError> {
    if data.len() < HEADER_LEN {
        return Err(DecodeError::Truncated {
            expected: HEADER_LEN,
            actual: data.len(),
        });
    }

    if data[0] != RECORD_FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(data[0]));
    }

    let deleted = DeletionState::from_tag(data[1]).ok_or(DecodeError::UnknownState(data[1]))?;

    let len = u32::from_le_bytes([data[2], data[3], data[4], data[5]]) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(DecodeError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_LEN,
        });
    }

    let expected = HEADER_LEN + len;
    if data.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: data.len(),
        });
    }
    if data.len() > expected {
        return Err(DecodeError::TrailingBytes {
            expected,
            actual: data.len(),
        });
    }

    let payload = std::str::from_utf8(&data[HEADER_LEN..])
        .map_err(|_| DecodeError::InvalidUtf8)?
        .to_owned();

    Ok(Record { deleted, payload })
}
