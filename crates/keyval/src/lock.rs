//! Advisory per-key lock table.
//!
//! Acquisition never blocks on another holder: a key that is already held
//! simply fails to acquire. The table is in-memory only and is lost when the
//! process exits.

use parking_lot::Mutex;
use std::collections::HashSet;

/// Set of keys currently marked as held
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<Vec<u8>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as held. Returns `false` if it was already held.
    pub fn try_acquire(&self, key: &[u8]) -> bool {
        let mut held = self.held.lock();
        if held.contains(key) {
            return false;
        }
        held.insert(key.to_vec());
        true
    }

    /// Clear the held marker for `key`. Releasing a free key is a no-op.
    pub fn release(&self, key: &[u8]) {
        self.held.lock().remove(key);
    }

    pub fn is_held(&self, key: &[u8]) -> bool {
        self.held.lock().contains(key)
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    /// Acquire `key` and return a guard that releases it on drop
    pub fn try_guard(&self, key: &[u8]) -> Option<KeyGuard<'_>> {
        if self.try_acquire(key) {
            Some(KeyGuard {
                table: self,
                key: key.to_vec(),
            })
        } else {
            None
        }
    }
}

/// Holds one key of a [`LockTable`] until dropped
#[derive(Debug)]
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyGuard<'a> {
    table: &'a LockTable,
    key: Vec<u8>,
}

impl KeyGuard<'_> {
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.key);
    }
}
