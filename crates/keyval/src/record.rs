//! Record model stored under every key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deletion state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeletionState {
    /// A live payload is present
    Live = 0,
    /// Tombstoned but recoverable
    Soft = 1,
    /// No live payload
    Hard = 2,
}

impl DeletionState {
    /// Wire tag for this state
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// State for a wire tag, if the tag is known
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DeletionState::Live),
            1 => Some(DeletionState::Soft),
            2 => Some(DeletionState::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for DeletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionState::Live => write!(f, "live"),
            DeletionState::Soft => write!(f, "soft"),
            DeletionState::Hard => write!(f, "hard"),
        }
    }
}

/// A stored record: deletion state plus an opaque payload.
///
/// `Record::hard()` is the canonical "no usable value" record; a key that
/// was never written reads back as exactly that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub deleted: DeletionState,
    pub payload: String,
}

impl Record {
    pub fn new(deleted: DeletionState, payload: impl Into<String>) -> Self {
        Self {
            deleted,
            payload: payload.into(),
        }
    }

    /// A live record carrying `payload`
    pub fn live(payload: impl Into<String>) -> Self {
        Self::new(DeletionState::Live, payload)
    }

    /// A soft-deleted record that keeps `payload` for recovery
    pub fn soft(payload: impl Into<String>) -> Self {
        Self::new(DeletionState::Soft, payload)
    }

    /// The hard-deleted sentinel, `{Hard, ""}`
    pub fn hard() -> Self {
        Self::new(DeletionState::Hard, String::new())
    }

    pub fn is_live(&self) -> bool {
        self.deleted == DeletionState::Live
    }

    pub fn is_hard_deleted(&self) -> bool {
        self.deleted == DeletionState::Hard
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::hard()
    }
}
