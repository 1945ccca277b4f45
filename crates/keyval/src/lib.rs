//! # keyval
//!
//! Persistent per-key record store with advisory key locking.
//!
//! Every key maps to a [`Record`]: a [`DeletionState`] plus an opaque
//! payload string. Records are encoded with a small versioned binary codec
//! and stored in an embedded, crash-safe storage engine (WAL + memtable +
//! sorted tables). A process-local lock table lets callers claim keys for
//! exclusive modification without ever blocking.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keyval::{KeyVal, KeyValConfig, Lookup, Record};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = KeyVal::open(KeyValConfig::new("./kv-data").with_soft_delete(true))?;
//!
//!     if store.lock_key(b"bucket/object") {
//!         store.put_record(b"bucket/object", &Record::live("meta"))?;
//!         store.unlock_key(b"bucket/object");
//!     }
//!
//!     match store.lookup(b"bucket/object") {
//!         Lookup::Found(record) => println!("{}: {}", record.deleted, record.payload),
//!         Lookup::NotFound => println!("no such key"),
//!         Lookup::Error(e) => eprintln!("lookup failed: {e}"),
//!     }
//!
//!     store.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Store Modes
//!
//! ```rust,no_run
//! use keyval::{KeyVal, KeyValConfig};
//!
//! // Persistent store (data survives restarts)
//! let persistent = KeyVal::open(KeyValConfig::new("./data"))?;
//!
//! // In-memory store (data lost on close)
//! let ephemeral = KeyVal::in_memory(KeyValConfig::default());
//! # Ok::<(), keyval::KeyValError>(())
//! ```

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod codec;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod record;

pub use codec::{DecodeError, EncodeError, MAX_PAYLOAD_LEN};
pub use config::KeyValConfig;
pub use error::{KeyValError, Lookup, Result};
pub use lock::{KeyGuard, LockTable};
pub use record::{DeletionState, Record};

pub use keyval_storage::{StorageConfig, StorageEngine, StorageStats};
pub use keyval_wal::SyncMode;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Storage backend behind the store
enum StorageBackend {
    /// Volatile storage using HashMap
    Memory(RwLock<HashMap<Vec<u8>, Vec<u8>>>),
    /// Durable storage using the LSM engine
    Persistent(StorageEngine),
}

impl StorageBackend {
    fn get(&self, key: &[u8]) -> keyval_core::Result<Option<Vec<u8>>> {
        match self {
            StorageBackend::Memory(map) => Ok(map.read().get(key).cloned()),
            StorageBackend::Persistent(engine) => engine.get(key),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> keyval_core::Result<()> {
        match self {
            StorageBackend::Memory(map) => {
                map.write().insert(key.to_vec(), value.to_vec());
                Ok(())
            }
            StorageBackend::Persistent(engine) => engine.put(key, value),
        }
    }

    fn sync(&self) -> keyval_core::Result<()> {
        match self {
            StorageBackend::Memory(_) => Ok(()),
            StorageBackend::Persistent(engine) => engine.sync(),
        }
    }

    fn close(self) -> keyval_core::Result<()> {
        match self {
            StorageBackend::Memory(_) => Ok(()),
            StorageBackend::Persistent(engine) => engine.close(),
        }
    }
}

struct KeyValInner {
    /// `None` once the store is closed
    backend: RwLock<Option<StorageBackend>>,
    locks: LockTable,
    content_path: std::path::PathBuf,
    soft_delete: bool,
    span: tracing::Span,
}

/// Handle to a record store.
///
/// Cheap to clone; all clones share the same engine and lock table.
/// The store moves one way from open to closed. After [`close`](Self::close)
/// writes fail with [`KeyValError::Closed`], lookups report it, and
/// [`lock_key`](Self::lock_key) refuses new locks.
#[derive(Clone)]
pub struct KeyVal {
    inner: Arc<KeyValInner>,
}

impl KeyVal {
    /// Open or create a persistent store at `config.storage_path`
    pub fn open(config: KeyValConfig) -> Result<Self> {
        let engine = {
            let _enter = config.span.enter();
            let engine =
                StorageEngine::open_with_config(&config.storage_path, config.storage.clone())
                    .map_err(|source| KeyValError::Open {
                        path: config.storage_path.clone(),
                        source,
                    })?;
            info!(
                path = %config.storage_path.display(),
                soft_delete = config.soft_delete,
                "record store opened"
            );
            engine
        };
        Ok(Self::with_backend(StorageBackend::Persistent(engine), config))
    }

    /// Create a volatile store; `storage_path` is ignored
    pub fn in_memory(config: KeyValConfig) -> Self {
        Self::with_backend(StorageBackend::Memory(RwLock::new(HashMap::new())), config)
    }

    fn with_backend(backend: StorageBackend, config: KeyValConfig) -> Self {
        KeyVal {
            inner: Arc::new(KeyValInner {
                backend: RwLock::new(Some(backend)),
                locks: LockTable::new(),
                content_path: config.content_path,
                soft_delete: config.soft_delete,
                span: config.span,
            }),
        }
    }

    /// Look up the record stored under `key`
    pub fn lookup(&self, key: &[u8]) -> Lookup {
        let _enter = self.inner.span.enter();
        let backend = self.inner.backend.read();
        let Some(backend) = backend.as_ref() else {
            return Lookup::Error(KeyValError::Closed);
        };

        match backend.get(key) {
            Ok(Some(bytes)) => match codec::decode(&bytes) {
                Ok(record) => Lookup::Found(record),
                Err(e) => Lookup::Error(e.into()),
            },
            Ok(None) => Lookup::NotFound,
            Err(e) => Lookup::Error(e.into()),
        }
    }

    /// Record stored under `key`, or [`Record::hard()`] when the key is
    /// missing or unreadable. Use [`lookup`](Self::lookup) to tell those
    /// apart.
    pub fn get_record(&self, key: &[u8]) -> Record {
        match self.lookup(key) {
            Lookup::Found(record) => record,
            Lookup::NotFound => Record::hard(),
            Lookup::Error(e) => {
                let _enter = self.inner.span.enter();
                warn!(key = %String::from_utf8_lossy(key), error = %e, "record lookup failed");
                Record::hard()
            }
        }
    }

    /// Store `record` under `key`, replacing any previous record
    pub fn put_record(&self, key: &[u8], record: &Record) -> Result<()> {
        let _enter = self.inner.span.enter();
        let bytes = codec::encode(record)?;

        let backend = self.inner.backend.read();
        let backend = backend.as_ref().ok_or(KeyValError::Closed)?;
        backend.put(key, &bytes)?;
        debug!(
            key = %String::from_utf8_lossy(key),
            state = %record.deleted,
            len = bytes.len(),
            "record stored"
        );
        Ok(())
    }

    /// Claim `key` for exclusive modification. Returns `false` if another
    /// caller holds it or the store is closed. Never blocks.
    ///
    /// A closed store refuses every lock, so a retry loop on `false` must
    /// check [`is_closed`](Self::is_closed) or it never terminates.
    pub fn lock_key(&self, key: &[u8]) -> bool {
        if self.is_closed() {
            return false;
        }
        self.inner.locks.try_acquire(key)
    }

    /// Release a claim on `key`. Releasing an unheld key is a no-op.
    pub fn unlock_key(&self, key: &[u8]) {
        self.inner.locks.release(key);
    }

    /// Claim `key` and release it automatically when the guard drops
    pub fn try_lock(&self, key: &[u8]) -> Option<KeyGuard<'_>> {
        if self.is_closed() {
            return None;
        }
        self.inner.locks.try_guard(key)
    }

    /// Force logged writes to disk. No-op for in-memory stores.
    pub fn sync(&self) -> Result<()> {
        let backend = self.inner.backend.read();
        let backend = backend.as_ref().ok_or(KeyValError::Closed)?;
        backend.sync()?;
        Ok(())
    }

    /// Close the store.
    ///
    /// Waits for in-flight operations, then flushes and releases the
    /// engine. The store counts as closed even if the engine reports an
    /// error while shutting down. Closing an already closed store succeeds.
    pub fn close(&self) -> Result<()> {
        let _enter = self.inner.span.enter();
        let Some(backend) = self.inner.backend.write().take() else {
            debug!("record store already closed");
            return Ok(());
        };
        backend.close()?;
        info!("record store closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.backend.read().is_none()
    }

    /// Returns whether this store is backed by the persistent engine
    pub fn is_persistent(&self) -> bool {
        matches!(
            self.inner.backend.read().as_ref(),
            Some(StorageBackend::Persistent(_))
        )
    }

    /// Content directory carried from the configuration
    pub fn content_path(&self) -> &Path {
        &self.inner.content_path
    }

    /// Soft delete flag carried from the configuration. The store itself
    /// accepts records in any deletion state.
    pub fn soft_delete_enabled(&self) -> bool {
        self.inner.soft_delete
    }

    /// Write raw bytes under `key`, bypassing the codec
    #[cfg(test)]
    fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let backend = self.inner.backend.read();
        let backend = backend.as_ref().ok_or(KeyValError::Closed)?;
        backend.put(key, value)?;
        Ok(())
    }
}
