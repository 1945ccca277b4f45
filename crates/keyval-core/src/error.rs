//! Error types shared by the keyval engine layers.

use thiserror::Error;

/// The error type for WAL and storage engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// On-disk data failed validation (bad magic, CRC mismatch)
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Storage engine error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
