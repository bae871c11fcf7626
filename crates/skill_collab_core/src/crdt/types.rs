//! Shared CRDT types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Origin of a CRDT update, used to distinguish local vs remote changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOrigin {
    /// Update originated from local user action
    Local,

    /// Update received from a remote peer
    Remote,
}

/// Notification delivered to document subscribers after the text changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    /// Merged text after the change.
    pub text: String,
    /// Where the change came from.
    pub origin: UpdateOrigin,
}

/// Receives `(file_id, delta)` for every broadcastable local mutation.
pub type LocalUpdateSink = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;
