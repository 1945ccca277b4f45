//! Memtable - In-memory sorted write buffer
//!
//! Holds recent writes until they are flushed to disk as a sorted table.
//! A `BTreeMap` keeps keys in byte order so a flush can stream entries
//! straight into a table writer.

use std::collections::BTreeMap;

/// Memtable - an in-memory sorted write buffer
///
/// Not internally synchronized; the storage engine guards it.
#[derive(Debug, Default)]
pub struct Memtable {
    /// The underlying sorted map
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Approximate size in bytes (for flush threshold checking)
    size_bytes: u64,
}

impl Memtable {
    /// Creates a new empty Memtable
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value stored under `key`
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let key_len = key.len() as u64;
        let value_len = value.len() as u64;

        match self.data.insert(key, value) {
            // The existing key is kept, only the value size changes
            Some(old) => self.size_bytes = self.size_bytes + value_len - old.len() as u64,
            None => self.size_bytes += key_len + value_len,
        }
    }

    /// Retrieves a value by key
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    /// Returns the approximate size of the memtable in bytes
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Returns the number of entries in the memtable
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the memtable is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns an iterator over all entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> {
        self.data.iter()
    }

    /// Clears the memtable
    pub fn clear(&mut self) {
        self.data.clear();
        self.size_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memtable_new() {
        let mt = Memtable::new();
        assert!(mt.is_empty());
        assert_eq!(mt.len(), 0);
        assert_eq!(mt.size_bytes(), 0);
    }

    #[test]
    fn test_memtable_put_get() {
        let mut mt = Memtable::new();

        mt.put(b"key1".to_vec(), b"value1".to_vec());
        mt.put(b"key2".to_vec(), b"value2".to_vec());

        assert_eq!(mt.len(), 2);
        assert_eq!(mt.get(b"key1"), Some(b"value1".as_slice()));
        assert_eq!(mt.get(b"key2"), Some(b"value2".as_slice()));
        assert_eq!(mt.get(b"key3"), None);
    }

    #[test]
    fn test_memtable_update_tracks_size() {
        let mut mt = Memtable::new();

        mt.put(b"key".to_vec(), b"value1".to_vec());
        assert_eq!(mt.size_bytes(), 9);

        mt.put(b"key".to_vec(), b"v2".to_vec());
        assert_eq!(mt.get(b"key"), Some(b"v2".as_slice()));
        assert_eq!(mt.len(), 1);
        assert_eq!(mt.size_bytes(), 5);
    }

    #[test]
    fn test_memtable_iter_sorted() {
        let mut mt = Memtable::new();

        mt.put(b"c".to_vec(), b"3".to_vec());
        mt.put(b"a".to_vec(), b"1".to_vec());
        mt.put(b"b".to_vec(), b"2".to_vec());

        let keys: Vec<_> = mt.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_memtable_clear() {
        let mut mt = Memtable::new();

        mt.put(b"key1".to_vec(), b"value1".to_vec());
        mt.put(b"key2".to_vec(), b"value2".to_vec());
        mt.clear();

        assert!(mt.is_empty());
        assert_eq!(mt.size_bytes(), 0);
    }
}
