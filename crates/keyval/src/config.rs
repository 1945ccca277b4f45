//! Store configuration

use keyval_storage::StorageConfig;
use std::path::PathBuf;
use tracing::Span;

/// Configuration for [`KeyVal`](crate::KeyVal)
#[derive(Debug, Clone)]
pub struct KeyValConfig {
    /// Directory holding the engine's WAL and sorted tables
    pub storage_path: PathBuf,
    /// Content directory for payload bodies; carried through, never touched
    pub content_path: PathBuf,
    /// Whether `Soft` records may be stored; fixed for the store's lifetime
    pub soft_delete: bool,
    /// Engine tuning
    pub storage: StorageConfig,
    /// Span under which all store diagnostics are emitted
    pub span: Span,
}

impl Default for KeyValConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./keyval-data"),
            content_path: PathBuf::from("./keyval-content"),
            soft_delete: false,
            storage: StorageConfig::default(),
            span: Span::none(),
        }
    }
}

impl KeyValConfig {
    /// Config for a store rooted at `storage_path`
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            ..Default::default()
        }
    }

    pub fn with_content_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_path = path.into();
        self
    }

    pub fn with_soft_delete(mut self, enabled: bool) -> Self {
        self.soft_delete = enabled;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}
