//! Registry of open skill documents.
//!
//! `DocumentRegistry` owns one [`SkillDoc`] per open file id for the current
//! workspace. Documents are created lazily on first open and survive `close`
//! (which only clears the client-local active flag), because a file may be
//! reopened while one of its saves is still in flight. Switching workspace
//! ids drops every document.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use super::skill_doc::SkillDoc;
use super::types::{LocalUpdateSink, TextChange};
use crate::error::{CollabError, Result};
use crate::listeners::ListenerId;

/// Registry of per-file skill documents for one workspace.
///
/// # Example
///
/// ```ignore
/// use skill_collab_core::crdt::DocumentRegistry;
///
/// let registry = DocumentRegistry::new();
/// registry.open("app-1", "file-1", "initial");
/// registry.update_text("file-1", "initial, edited")?;
/// assert_eq!(registry.get_text("file-1").as_deref(), Some("initial, edited"));
/// ```
#[derive(Default)]
pub struct DocumentRegistry {
    workspace_id: RwLock<Option<String>>,
    docs: RwLock<HashMap<String, Arc<SkillDoc>>>,
    active: RwLock<HashSet<String>>,
    /// Propagated to each document when created.
    local_sink: RwLock<Option<LocalUpdateSink>>,
}

impl DocumentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sink receiving local deltas of every document (current and future).
    pub fn set_local_sink(&self, sink: Option<LocalUpdateSink>) {
        *self.local_sink.write().unwrap() = sink.clone();
        let docs = self.docs.read().unwrap();
        for doc in docs.values() {
            doc.set_local_sink(sink.clone());
        }
    }

    /// The workspace the open documents belong to.
    pub fn workspace_id(&self) -> Option<String> {
        self.workspace_id.read().unwrap().clone()
    }

    /// Open a document, reusing an existing one for the same file id.
    ///
    /// A new document is seeded with `initial_content`. Opening under a
    /// different workspace id first drops every document of the old one.
    pub fn open(&self, workspace_id: &str, file_id: &str, initial_content: &str) -> Arc<SkillDoc> {
        {
            let mut current = self.workspace_id.write().unwrap();
            if current.as_deref() != Some(workspace_id) {
                if current.is_some() {
                    log::info!(
                        "[DocRegistry] workspace changed to {}, dropping open documents",
                        workspace_id
                    );
                    self.docs.write().unwrap().clear();
                    self.active.write().unwrap().clear();
                }
                *current = Some(workspace_id.to_string());
            }
        }

        // Fast path: check cache with read lock
        {
            let docs = self.docs.read().unwrap();
            if let Some(doc) = docs.get(file_id) {
                return Arc::clone(doc);
            }
        }

        let mut docs = self.docs.write().unwrap();

        // Double-check: another caller may have inserted while we waited
        if let Some(doc) = docs.get(file_id) {
            return Arc::clone(doc);
        }

        let sink = self.local_sink.read().unwrap().clone();
        let doc = Arc::new(SkillDoc::seeded(file_id, initial_content, sink));
        docs.insert(file_id.to_string(), Arc::clone(&doc));
        log::debug!("[DocRegistry] opened {}", file_id);
        doc
    }

    /// Get an open document.
    pub fn get(&self, file_id: &str) -> Option<Arc<SkillDoc>> {
        self.docs.read().unwrap().get(file_id).cloned()
    }

    /// Check if a document is open.
    pub fn is_open(&self, file_id: &str) -> bool {
        self.docs.read().unwrap().contains_key(file_id)
    }

    /// Get all open file ids.
    pub fn open_files(&self) -> Vec<String> {
        self.docs.read().unwrap().keys().cloned().collect()
    }

    /// Apply a local edit. Returns `Ok(false)` if the text was already equal.
    pub fn update_text(&self, file_id: &str, text: &str) -> Result<bool> {
        let doc = self
            .get(file_id)
            .ok_or_else(|| CollabError::DocumentNotOpen(file_id.to_string()))?;
        doc.set_text(text)
    }

    /// Current merged text, or `None` if the file is not open.
    pub fn get_text(&self, file_id: &str) -> Option<String> {
        self.get(file_id).map(|doc| doc.text())
    }

    /// Full snapshot of a document, or `None` if the file is not open.
    pub fn snapshot(&self, file_id: &str) -> Option<Vec<u8>> {
        self.get(file_id).map(|doc| doc.encode_snapshot())
    }

    /// Import a remote delta or snapshot.
    ///
    /// Failures are logged and swallowed: a bad or out-of-order delta must not
    /// take the session down, the next valid delta or a resync repairs it.
    pub fn apply_remote_update(&self, file_id: &str, update: &[u8], is_snapshot: bool) {
        let Some(doc) = self.get(file_id) else {
            log::debug!("[DocRegistry] ignoring update for unopened file {}", file_id);
            return;
        };

        match doc.apply_update(update, is_snapshot) {
            Ok(changed) => log::debug!(
                "[DocRegistry] merged {} bytes into {} (snapshot: {}, changed: {})",
                update.len(),
                file_id,
                is_snapshot,
                changed
            ),
            Err(e) => log::warn!("[DocRegistry] dropped update for {}: {}", file_id, e),
        }
    }

    /// Subscribe to remote-text changes of an open document.
    pub fn subscribe(
        &self,
        file_id: &str,
        callback: Arc<dyn Fn(&TextChange) + Send + Sync>,
    ) -> Option<ListenerId> {
        self.get(file_id).map(|doc| doc.subscribe(callback))
    }

    /// Remove a subscription made with [`DocumentRegistry::subscribe`].
    pub fn unsubscribe(&self, file_id: &str, id: ListenerId) -> bool {
        self.get(file_id)
            .map(|doc| doc.unsubscribe(id))
            .unwrap_or(false)
    }

    /// Mark a file as (in)active for this client.
    pub fn set_active(&self, file_id: &str, active: bool) {
        let mut set = self.active.write().unwrap();
        if active {
            set.insert(file_id.to_string());
        } else {
            set.remove(file_id);
        }
    }

    /// Check if a file is marked active.
    pub fn is_active(&self, file_id: &str) -> bool {
        self.active.read().unwrap().contains(file_id)
    }

    /// Close a file: clears client-local bookkeeping only, the CRDT state stays.
    pub fn close(&self, file_id: &str) {
        self.set_active(file_id, false);
        log::debug!("[DocRegistry] closed {}", file_id);
    }

    /// Drop a document entirely.
    pub fn destroy(&self, file_id: &str) -> Option<Arc<SkillDoc>> {
        self.set_active(file_id, false);
        self.docs.write().unwrap().remove(file_id)
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    /// Check if no documents are open.
    pub fn is_empty(&self) -> bool {
        self.docs.read().unwrap().is_empty()
    }

    /// Drop every document and forget the workspace.
    pub fn clear(&self) {
        self.docs.write().unwrap().clear();
        self.active.write().unwrap().clear();
        *self.workspace_id.write().unwrap() = None;
    }
}

impl std::fmt::Debug for DocumentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRegistry")
            .field("workspace_id", &self.workspace_id())
            .field("open_docs", &self.len())
            .finish_non_exhaustive()
    }
}
