//! Per-file replicated skill document.
//!
//! This module provides `SkillDoc`, a Y.Doc holding the text of one open
//! skill file. Local mutations produce binary deltas that are handed to a
//! [`LocalUpdateSink`]; remote deltas and snapshots are merged in and
//! announced to subscribers as [`TextChange`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use yrs::{
    Doc, GetString, ReadTxn, StateVector, Text, TextRef, Transact, Update,
    updates::decoder::Decode,
};

use super::types::{LocalUpdateSink, TextChange, UpdateOrigin};
use crate::error::{CollabError, Result};
use crate::listeners::{ListenerId, ListenerRegistry};

/// Name of the Y.Text holding the skill content.
const CONTENT_TEXT_NAME: &str = "content";

/// The Y.Doc and its root text. Swapped out wholesale when a snapshot
/// replaces an untouched replica.
struct Replica {
    doc: Doc,
    text: TextRef,
}

impl Replica {
    fn new() -> Self {
        let doc = Doc::new();
        let text = doc.get_or_insert_text(CONTENT_TEXT_NAME);
        Self { doc, text }
    }

    fn text(&self) -> String {
        let txn = self.doc.transact();
        self.text.get_string(&txn)
    }

    fn state_vector(&self) -> StateVector {
        let txn = self.doc.transact();
        txn.state_vector()
    }
}

/// A CRDT document for a single skill file.
///
/// # Example
///
/// ```ignore
/// use skill_collab_core::crdt::SkillDoc;
///
/// let doc = SkillDoc::seeded("file-1", "# Skill", None);
/// doc.set_text("# Skill\n\nRun the tests.")?;
/// assert!(doc.text().ends_with("tests."));
/// ```
pub struct SkillDoc {
    file_id: String,
    replica: RwLock<Replica>,
    subscribers: ListenerRegistry<TextChange>,
    local_sink: RwLock<Option<LocalUpdateSink>>,
    /// Set while the seeding mutation runs so it is never broadcast.
    suppress_next_broadcast: AtomicBool,
    /// True once a user edit (not the seed) has been applied.
    locally_edited: AtomicBool,
    /// True once any remote update or snapshot has been merged.
    merged_remote: AtomicBool,
}

impl SkillDoc {
    /// Create a document seeded with `initial_content`.
    ///
    /// The seed represents this client's view of the last persisted content,
    /// not a user edit, so the resulting delta is not handed to `local_sink`.
    pub fn seeded(
        file_id: impl Into<String>,
        initial_content: &str,
        local_sink: Option<LocalUpdateSink>,
    ) -> Self {
        let doc = Self {
            file_id: file_id.into(),
            replica: RwLock::new(Replica::new()),
            subscribers: ListenerRegistry::new(),
            local_sink: RwLock::new(local_sink),
            suppress_next_broadcast: AtomicBool::new(false),
            locally_edited: AtomicBool::new(false),
            merged_remote: AtomicBool::new(false),
        };

        doc.suppress_next_broadcast.store(true, Ordering::SeqCst);
        if let Err(e) = doc.mutate(initial_content) {
            log::warn!("[SkillDoc] failed to seed {}: {}", doc.file_id, e);
        }
        // An empty seed performs no mutation; the flag must not leak onto the first edit.
        doc.suppress_next_broadcast.store(false, Ordering::SeqCst);
        doc.locally_edited.store(false, Ordering::SeqCst);
        doc
    }

    /// Get the file id this document belongs to.
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Replace the sink that receives local deltas.
    pub fn set_local_sink(&self, sink: Option<LocalUpdateSink>) {
        *self.local_sink.write().unwrap() = sink;
    }

    // ==================== Text Operations ====================

    /// Get the current merged text.
    pub fn text(&self) -> String {
        self.replica.read().unwrap().text()
    }

    /// Set the text using the minimal single-range edit.
    ///
    /// Returns `Ok(false)` without touching the CRDT when the text is already
    /// equal, so redundant writes never produce a delta. Subscribers see the
    /// change with [`UpdateOrigin::Local`].
    pub fn set_text(&self, content: &str) -> Result<bool> {
        let changed = self.mutate(content)?;
        if changed {
            self.locally_edited.store(true, Ordering::SeqCst);
            self.subscribers.emit(&TextChange {
                text: content.to_string(),
                origin: UpdateOrigin::Local,
            });
        }
        Ok(changed)
    }

    fn mutate(&self, content: &str) -> Result<bool> {
        let update = {
            let replica = self.replica.read().unwrap();
            let current = replica.text();
            if current == content {
                return Ok(false);
            }

            let sv_before = replica.state_vector();
            let edit = TextEdit::between(&current, content);
            {
                let mut txn = replica.doc.transact_mut();
                if edit.delete_len > 0 {
                    replica
                        .text
                        .remove_range(&mut txn, edit.start as u32, edit.delete_len as u32);
                }
                if !edit.insert.is_empty() {
                    replica.text.insert(&mut txn, edit.start as u32, edit.insert);
                }
            }

            let txn = replica.doc.transact();
            txn.encode_state_as_update_v1(&sv_before)
        };

        self.broadcast(&update);
        Ok(true)
    }

    /// Hand a local delta to the sink unless this is the suppressed seed.
    fn broadcast(&self, update: &[u8]) {
        if update.is_empty() {
            return;
        }
        if self.suppress_next_broadcast.swap(false, Ordering::SeqCst) {
            log::debug!("[SkillDoc] not broadcasting seed of {}", self.file_id);
            return;
        }

        let sink = self.local_sink.read().unwrap().clone();
        if let Some(sink) = sink {
            sink(&self.file_id, update);
        }
    }

    // ==================== Sync Operations ====================

    /// Encode the full state as a snapshot update.
    pub fn encode_snapshot(&self) -> Vec<u8> {
        let replica = self.replica.read().unwrap();
        let txn = replica.doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }

    /// Whether a user edit has been applied since the document was seeded.
    pub fn is_locally_edited(&self) -> bool {
        self.locally_edited.load(Ordering::SeqCst)
    }

    /// Whether the replica still holds nothing but its unshared seed.
    fn holds_only_seed(&self) -> bool {
        !self.is_locally_edited() && !self.merged_remote.load(Ordering::SeqCst)
    }

    /// Merge a remote delta or snapshot.
    ///
    /// A snapshot arriving while the replica holds only its seed replaces the
    /// replica outright (the seed was never shared, so there is nothing to
    /// keep). Every later update is merged; duplicate imports are no-ops.
    ///
    /// Returns whether the text changed. Subscribers are notified only then.
    pub fn apply_update(&self, update: &[u8], is_snapshot: bool) -> Result<bool> {
        let decoded = Update::decode_v1(update)
            .map_err(|e| CollabError::Crdt(format!("Failed to decode update: {}", e)))?;

        let (before, after) = if is_snapshot && self.holds_only_seed() {
            let fresh = Replica::new();
            {
                let mut txn = fresh.doc.transact_mut();
                txn.apply_update(decoded)
                    .map_err(|e| CollabError::Crdt(format!("Failed to apply snapshot: {}", e)))?;
            }
            let after = fresh.text();
            let mut replica = self.replica.write().unwrap();
            let before = replica.text();
            *replica = fresh;
            (before, after)
        } else {
            let replica = self.replica.read().unwrap();
            let before = replica.text();
            {
                let mut txn = replica.doc.transact_mut();
                txn.apply_update(decoded)
                    .map_err(|e| CollabError::Crdt(format!("Failed to apply update: {}", e)))?;
            }
            (before, replica.text())
        };
        self.merged_remote.store(true, Ordering::SeqCst);

        if before == after {
            return Ok(false);
        }

        self.subscribers.emit(&TextChange {
            text: after,
            origin: UpdateOrigin::Remote,
        });
        Ok(true)
    }

    // ==================== Observers ====================

    /// Subscribe to text changes. `origin` tells local edits from merged remote updates.
    pub fn subscribe(&self, callback: Arc<dyn Fn(&TextChange) + Send + Sync>) -> ListenerId {
        self.subscribers.subscribe(callback)
    }

    /// Remove a subscription made with [`SkillDoc::subscribe`].
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}

impl std::fmt::Debug for SkillDoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillDoc")
            .field("file_id", &self.file_id)
            .field("text_len", &self.text().len())
            .field("locally_edited", &self.is_locally_edited())
            .field("merged_remote", &self.merged_remote.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// A single replace operation turning one string into another, in byte offsets.
#[derive(Debug, PartialEq, Eq)]
struct TextEdit<'a> {
    start: usize,
    delete_len: usize,
    insert: &'a str,
}

impl<'a> TextEdit<'a> {
    /// Common prefix/suffix diff, split on char boundaries.
    fn between(current: &str, target: &'a str) -> Self {
        let prefix: usize = current
            .chars()
            .zip(target.chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum();

        let current_rest = &current[prefix..];
        let target_rest = &target[prefix..];
        let suffix: usize = current_rest
            .chars()
            .rev()
            .zip(target_rest.chars().rev())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum();

        Self {
            start: prefix,
            delete_len: current_rest.len() - suffix,
            insert: &target_rest[..target_rest.len() - suffix],
        }
    }
}
