//! Content cache capability.
//!
//! The host keeps the last known persisted state of each file under an
//! `{app_id, node_id}` key as a JSON-serialized [`CachedFile`]. Entries
//! written by older clients may be the raw content string instead, so a value
//! that does not parse as the wrapper is read back as content.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cache key of one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    /// Workspace the file belongs to.
    pub app_id: String,
    /// File id.
    pub node_id: String,
}

impl CacheKey {
    /// Key for `node_id` in workspace `app_id`.
    pub fn new(app_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            node_id: node_id.into(),
        }
    }
}

/// Cached content plus optional metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedFile {
    /// File text.
    pub content: String,
    /// Metadata stored alongside, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl CachedFile {
    /// Parse a cached value, treating anything but the JSON wrapper as raw content.
    pub fn decode(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| CachedFile {
            content: raw.to_string(),
            metadata: None,
        })
    }

    /// JSON wrapper written by [`ContentCache::write`].
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// String-valued cache store keyed by [`CacheKey`].
pub trait ContentCache: Send + Sync {
    /// Stored string for `key`.
    fn read_raw(&self, key: &CacheKey) -> Option<String>;

    /// Store `value` under `key`.
    fn write_raw(&self, key: &CacheKey, value: String);

    /// Decoded entry for `key`.
    fn read(&self, key: &CacheKey) -> Option<CachedFile> {
        self.read_raw(key).map(|raw| CachedFile::decode(&raw))
    }

    /// Encode and store `file`. Encoding failures are logged and dropped.
    fn write(&self, key: &CacheKey, file: &CachedFile) {
        match file.encode() {
            Ok(raw) => self.write_raw(key, raw),
            Err(e) => log::warn!(
                "[ContentCache] failed to encode entry for {}: {}",
                key.node_id,
                e
            ),
        }
    }
}

/// In-memory [`ContentCache`].
#[derive(Debug, Default)]
pub struct MemoryContentCache {
    entries: RwLock<HashMap<CacheKey, String>>,
}

impl MemoryContentCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentCache for MemoryContentCache {
    fn read_raw(&self, key: &CacheKey) -> Option<String> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn write_raw(&self, key: &CacheKey, value: String) {
        self.entries.write().unwrap().insert(key.clone(), value);
    }
}
