//! # Local Cache
//!
//! Fallback of last resort for saved edits: a key/value store holding, per
//! page, a JSON mapping from identity ordinal to markup. Written on every
//! save regardless of gateway reachability and replayed onto freshly
//! rendered pages at load time. Corrupt entries are treated as absent.

use crate::errors::EditorError;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Fixed prefix for per-page storage keys.
pub const CACHE_PREFIX: &str = "pw_v1_";

/// Storage key for a page path.
pub fn storage_key(page_path: &str) -> String {
    format!("{}{}", CACHE_PREFIX, page_path)
}

/// Browser-local-storage shaped store.
pub trait LocalCache {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), EditorError>;
}

/// In-memory store, used in tests and as the default when no persistence is
/// wanted.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: BTreeMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EditorError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Single-file JSON store, write-through on every set.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileCache {
    /// Open the store, ignoring a missing or corrupt backing file.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { path, entries }
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EditorError> {
        self.entries.insert(key.to_string(), value.to_string());
        let raw = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| EditorError::Cache(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
