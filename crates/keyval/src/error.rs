//! Store errors and the tri-state lookup result.

use crate::codec::{DecodeError, EncodeError};
use crate::record::Record;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`KeyVal`](crate::KeyVal)
#[derive(Debug, Error)]
pub enum KeyValError {
    #[error("failed to open store at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: keyval_core::Error,
    },

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("storage engine error: {0}")]
    Engine(#[from] keyval_core::Error),

    #[error("store is closed")]
    Closed,
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, KeyValError>;

/// Outcome of a key lookup
#[derive(Debug)]
pub enum Lookup {
    /// The key holds a decodable record
    Found(Record),
    /// The key has never been written
    NotFound,
    /// The engine or the codec failed
    Error(KeyValError),
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Lookup::NotFound)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Lookup::Error(_))
    }

    /// The record if found, otherwise the hard-deleted sentinel
    pub fn into_record(self) -> Record {
        match self {
            Lookup::Found(record) => record,
            Lookup::NotFound | Lookup::Error(_) => Record::hard(),
        }
    }

    /// Convert into a conventional `Result<Option<Record>>`
    pub fn into_result(self) -> Result<Option<Record>> {
        match self {
            Lookup::Found(record) => Ok(Some(record)),
            Lookup::NotFound => Ok(None),
            Lookup::Error(e) => Err(e),
        }
    }
}

impl From<Result<Option<Record>>> for Lookup {
    fn from(result: Result<Option<Record>>) -> Self {
        match result {
            Ok(Some(record)) => Lookup::Found(record),
            Ok(None) => Lookup::NotFound,
            Err(e) => Lookup::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_conversions() {
        let found = Lookup::Found(Record::live("v"));
        assert!(found.is_found());
        assert_eq!(found.into_result().unwrap(), Some(Record::live("v")));

        assert!(Lookup::NotFound.into_result().unwrap().is_none());
        assert_eq!(Lookup::NotFound.into_record(), Record::hard());

        let err = Lookup::Error(KeyValError::Closed);
        assert!(err.is_error());
        assert_eq!(err.into_record(), Record::hard());
    }

    #[test]
    fn test_error_display() {
        let err = KeyValError::Open {
            path: PathBuf::from("/data/kv"),
            source: keyval_core::Error::Storage("boom".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("/data/kv"));
        assert!(msg.contains("boom"));

        let err: KeyValError = DecodeError::UnknownState(7).into();
        assert!(matches!(err, KeyValError::Decode(DecodeError::UnknownState(7))));
    }
}
