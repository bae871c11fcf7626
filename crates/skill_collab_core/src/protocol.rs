//! Wire protocol for skill collaboration.
//!
//! Three named events travel over a workspace connection:
//!
//! - `skill_update`: a binary CRDT delta or full snapshot ([`SkillUpdatePayload`])
//! - `skill_status`: the server's leader flag for a file ([`SkillStatusPayload`])
//! - `collaboration_update` / `collaboration_event`: a generic JSON envelope
//!   ([`CollaborationEnvelope`]) whose `type` field selects one of the
//!   [`CollaborationMessage`] variants
//!
//! The envelope is decoded into the closed [`CollaborationMessage`] enum at the
//! edge, so dispatch sites match exhaustively and an unknown `type` is a
//! decode error rather than a silently ignored string.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::{CollabError, Result};

/// Event name for binary document updates (both directions).
pub const SKILL_UPDATE_EVENT: &str = "skill_update";

/// Event name for server-pushed leader status.
pub const SKILL_STATUS_EVENT: &str = "skill_status";

/// Event name for inbound envelopes.
pub const COLLABORATION_UPDATE_EVENT: &str = "collaboration_update";

/// Event name for outbound envelopes.
pub const COLLABORATION_EVENT: &str = "collaboration_event";

/// Incremental delta or full snapshot for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SkillUpdatePayload {
    /// File the update belongs to.
    pub file_id: String,
    /// Opaque yrs v1 update bytes.
    pub update: Vec<u8>,
    /// True when `update` encodes the complete document state.
    #[serde(default)]
    pub is_snapshot: bool,
}

/// Leader flag pushed by the server. Clients never originate this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SkillStatusPayload {
    /// File the flag applies to.
    pub file_id: String,
    /// Whether this client now leads the file.
    #[serde(rename = "isLeader")]
    pub is_leader: bool,
}

/// Generic JSON envelope carried by `collaboration_update` and `collaboration_event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CollaborationEnvelope {
    /// Message kind; one of [`CollaborationMessage::KINDS`] for known messages.
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific payload.
    #[serde(default)]
    pub data: Value,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Sender, stamped by the server on relayed envelopes.
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// The closed set of envelope message kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CollaborationMessage {
    /// Ask the leader for a full snapshot of a file.
    SkillResyncRequest {
        /// File to resync.
        file_id: String,
    },

    /// Ask the leader to persist its current state of a file.
    SkillSyncRequest {
        /// File to persist.
        file_id: String,
    },

    /// Presence: the sender focused (or left) a file.
    SkillFileActive {
        /// File the presence refers to.
        file_id: String,
        /// False when the sender left the file.
        active: bool,
    },

    /// Local selection as absolute text offsets.
    SkillCursor {
        /// File the selection is in.
        file_id: String,
        /// Anchor offset.
        start: usize,
        /// Head offset; equal to `start` for a caret.
        end: usize,
    },

    /// The sender's editor lost focus; drop its cursor immediately.
    SkillCursorClear {
        /// File whose cursor is dropped.
        file_id: String,
    },

    /// The leader persisted a file; followers fold it into their caches.
    SkillFileSaved {
        /// File that was persisted.
        file_id: String,
        /// Persisted text.
        content: String,
        /// Normalized metadata, when the save carried any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        metadata: Option<Value>,
    },
}

impl CollaborationMessage {
    /// Every `type` string this client understands.
    pub const KINDS: [&'static str; 6] = [
        "skill_resync_request",
        "skill_sync_request",
        "skill_file_active",
        "skill_cursor",
        "skill_cursor_clear",
        "skill_file_saved",
    ];

    /// The `type` string of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            CollaborationMessage::SkillResyncRequest { .. } => "skill_resync_request",
            CollaborationMessage::SkillSyncRequest { .. } => "skill_sync_request",
            CollaborationMessage::SkillFileActive { .. } => "skill_file_active",
            CollaborationMessage::SkillCursor { .. } => "skill_cursor",
            CollaborationMessage::SkillCursorClear { .. } => "skill_cursor_clear",
            CollaborationMessage::SkillFileSaved { .. } => "skill_file_saved",
        }
    }

    /// The file the message is about.
    pub fn file_id(&self) -> &str {
        match self {
            CollaborationMessage::SkillResyncRequest { file_id }
            | CollaborationMessage::SkillSyncRequest { file_id }
            | CollaborationMessage::SkillFileActive { file_id, .. }
            | CollaborationMessage::SkillCursor { file_id, .. }
            | CollaborationMessage::SkillCursorClear { file_id }
            | CollaborationMessage::SkillFileSaved { file_id, .. } => file_id,
        }
    }

    /// Wrap into an envelope stamped with `timestamp` (ms).
    pub fn to_envelope(&self, timestamp: i64) -> Result<CollaborationEnvelope> {
        let mut value = serde_json::to_value(self)?;
        let data = value
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null);
        Ok(CollaborationEnvelope {
            kind: self.kind().to_string(),
            data,
            timestamp,
            user_id: None,
        })
    }
}

impl TryFrom<&CollaborationEnvelope> for CollaborationMessage {
    type Error = CollabError;

    fn try_from(envelope: &CollaborationEnvelope) -> Result<Self> {
        if !Self::KINDS.contains(&envelope.kind.as_str()) {
            return Err(CollabError::UnknownMessage(envelope.kind.clone()));
        }

        let tagged = serde_json::json!({
            "type": envelope.kind,
            "data": envelope.data,
        });
        serde_json::from_value(tagged)
            .map_err(|e| CollabError::Protocol(format!("{}: {}", envelope.kind, e)))
    }
}

/// Inbound events delivered by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection was (re)established.
    Connect,
    /// The connection dropped.
    Disconnect,
    /// `skill_update`
    SkillUpdate(SkillUpdatePayload),
    /// `skill_status`
    SkillStatus(SkillStatusPayload),
    /// `collaboration_update`
    CollaborationUpdate(CollaborationEnvelope),
}

/// Outbound events handed to [`Transport::emit`](crate::transport::Transport::emit).
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Sent as `skill_update`.
    SkillUpdate(SkillUpdatePayload),
    /// Sent as `collaboration_event`.
    CollaborationEvent(CollaborationEnvelope),
}

impl OutboundEvent {
    /// Name of the transport event this is sent as.
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundEvent::SkillUpdate(_) => SKILL_UPDATE_EVENT,
            OutboundEvent::CollaborationEvent(_) => COLLABORATION_EVENT,
        }
    }

    /// JSON body of the event.
    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            OutboundEvent::SkillUpdate(payload) => serde_json::to_value(payload)?,
            OutboundEvent::CollaborationEvent(envelope) => serde_json::to_value(envelope)?,
        })
    }
}

/// Current time in ms, used to stamp envelopes and cursor entries.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
