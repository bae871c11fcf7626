//! Last-resort content registered by editors that are about to unmount.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

/// Content and metadata an editor still holds for a file.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackSnapshot {
    /// Text the editor shows.
    pub content: String,
    /// Metadata the editor was opened with.
    pub metadata: Option<Value>,
}

/// Mapping `file_id -> FallbackSnapshot`.
///
/// Consulted only when neither a draft nor a cache entry can supply content.
#[derive(Debug, Default)]
pub struct FallbackRegistry {
    entries: RwLock<HashMap<String, FallbackSnapshot>>,
}

impl FallbackRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the fallback for a file.
    pub fn register(&self, file_id: &str, snapshot: FallbackSnapshot) {
        self.entries
            .write()
            .unwrap()
            .insert(file_id.to_string(), snapshot);
    }

    /// Revoke the fallback for a file.
    pub fn unregister(&self, file_id: &str) -> Option<FallbackSnapshot> {
        self.entries.write().unwrap().remove(file_id)
    }

    /// Current fallback for a file.
    pub fn get(&self, file_id: &str) -> Option<FallbackSnapshot> {
        self.entries.read().unwrap().get(file_id).cloned()
    }

    /// Drop every fallback.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}
