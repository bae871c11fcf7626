//! Draft and dirty state of open skill files.
//!
//! The higher-level editor store owns this state; the collaboration core only
//! reads and updates it through [`DraftStore`]. A file has dirty content when
//! it has a draft, and dirty metadata when its committed metadata was changed
//! since the last save. [`MemoryDraftStore`] is the in-process implementation.

use std::collections::HashSet;
use std::sync::RwLock;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// Workspace-scoped draft, metadata, and dirty-flag state.
pub trait DraftStore: Send + Sync {
    /// Unsaved content of a file, if any.
    fn draft_content(&self, file_id: &str) -> Option<String>;

    /// Set the draft (marks content dirty).
    fn set_draft_content(&self, file_id: &str, content: String);

    /// Drop the draft (clears dirty content).
    fn clear_draft_content(&self, file_id: &str);

    /// Files with a draft, in the order they became dirty.
    fn dirty_content_ids(&self) -> Vec<String>;

    /// Committed metadata of a file.
    fn file_metadata(&self, file_id: &str) -> Option<Value>;

    /// Replace committed metadata without touching the dirty flag.
    fn set_file_metadata(&self, file_id: &str, metadata: Value);

    /// Replace committed metadata and mark it dirty.
    fn set_draft_metadata(&self, file_id: &str, metadata: Value);

    /// Whether committed metadata awaits a save.
    fn is_metadata_dirty(&self, file_id: &str) -> bool;

    /// Mark metadata as saved.
    fn clear_metadata_dirty(&self, file_id: &str);

    /// Files with dirty metadata, in the order they became dirty.
    fn dirty_metadata_ids(&self) -> Vec<String>;

    /// Last content known to be persisted.
    fn persisted_content(&self, file_id: &str) -> Option<String>;

    /// Record what was just persisted.
    fn set_persisted_content(&self, file_id: &str, content: String);

    /// Turn a transient preview tab into a regular one.
    fn pin_tab(&self, file_id: &str);

    /// Whether the tab was pinned.
    fn is_pinned(&self, file_id: &str) -> bool;
}

#[derive(Debug, Default)]
struct StoreState {
    drafts: IndexMap<String, String>,
    metadata: IndexMap<String, Value>,
    dirty_metadata: IndexSet<String>,
    persisted: IndexMap<String, String>,
    pinned: HashSet<String>,
}

/// In-memory [`DraftStore`].
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    state: RwLock<StoreState>,
}

impl MemoryDraftStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn draft_content(&self, file_id: &str) -> Option<String> {
        self.state.read().unwrap().drafts.get(file_id).cloned()
    }

    fn set_draft_content(&self, file_id: &str, content: String) {
        self.state
            .write()
            .unwrap()
            .drafts
            .insert(file_id.to_string(), content);
    }

    fn clear_draft_content(&self, file_id: &str) {
        self.state.write().unwrap().drafts.shift_remove(file_id);
    }

    fn dirty_content_ids(&self) -> Vec<String> {
        self.state.read().unwrap().drafts.keys().cloned().collect()
    }

    fn file_metadata(&self, file_id: &str) -> Option<Value> {
        self.state.read().unwrap().metadata.get(file_id).cloned()
    }

    fn set_file_metadata(&self, file_id: &str, metadata: Value) {
        self.state
            .write()
            .unwrap()
            .metadata
            .insert(file_id.to_string(), metadata);
    }

    fn set_draft_metadata(&self, file_id: &str, metadata: Value) {
        let mut state = self.state.write().unwrap();
        state.metadata.insert(file_id.to_string(), metadata);
        state.dirty_metadata.insert(file_id.to_string());
    }

    fn is_metadata_dirty(&self, file_id: &str) -> bool {
        self.state.read().unwrap().dirty_metadata.contains(file_id)
    }

    fn clear_metadata_dirty(&self, file_id: &str) {
        self.state
            .write()
            .unwrap()
            .dirty_metadata
            .shift_remove(file_id);
    }

    fn dirty_metadata_ids(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .dirty_metadata
            .iter()
            .cloned()
            .collect()
    }

    fn persisted_content(&self, file_id: &str) -> Option<String> {
        self.state.read().unwrap().persisted.get(file_id).cloned()
    }

    fn set_persisted_content(&self, file_id: &str, content: String) {
        self.state
            .write()
            .unwrap()
            .persisted
            .insert(file_id.to_string(), content);
    }

    fn pin_tab(&self, file_id: &str) {
        self.state.write().unwrap().pinned.insert(file_id.to_string());
    }

    fn is_pinned(&self, file_id: &str) -> bool {
        self.state.read().unwrap().pinned.contains(file_id)
    }
}
