//! Cursor presence channel.
//!
//! Outbound, local selection changes go through a per-file
//! [`SelectionThrottle`] and are sent as `skill_cursor`; losing focus sends
//! `skill_cursor_clear` right away. Inbound, remote cursors are kept per file
//! and per user. Entries older than the TTL are never evicted here: they are
//! filtered out on every [`CursorPresence::render`] pass.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use super::style::{StyleRegistry, StyleRule, user_color};
use super::throttle::{Selection, SelectionThrottle};
use crate::config::CollabConfig;
use crate::editor::{EditorWidget, TextPosition, ViewportPoint};
use crate::session::{SessionEvent, SessionManager};

/// Last known selection of one remote user in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorEntry {
    /// Owner of the selection.
    pub user_id: String,
    /// Anchor offset.
    pub start: usize,
    /// Head offset.
    pub end: usize,
    /// Last write, ms since the Unix epoch.
    pub timestamp: i64,
}

/// A user in the workspace presence list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    /// Stable user id.
    pub user_id: String,
    /// Display name used for caret labels.
    pub username: String,
}

/// Caret of a remote user, positioned in the viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCaret {
    /// Owner of the caret.
    pub user_id: String,
    /// Username, or the user id when no name is known.
    pub label: String,
    /// Palette color for `user_id`.
    pub color: &'static str,
    /// Where the head offset sits in the viewport.
    pub point: ViewportPoint,
}

/// Background decoration over a remote user's non-empty selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionDecoration {
    /// Owner of the selection.
    pub user_id: String,
    /// Lower offset, clamped to the document.
    pub from: usize,
    /// Upper offset, clamped to the document.
    pub to: usize,
    /// Per-user class from the style registry.
    pub class_name: String,
}

/// Everything the host draws for one render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorOverlay {
    /// One caret per visible remote user.
    pub carets: Vec<RemoteCaret>,
    /// Highlights for non-empty selections.
    pub decorations: Vec<SelectionDecoration>,
    /// Rules not handed out by an earlier pass.
    pub new_style_rules: Vec<StyleRule>,
}

/// Remote cursor store and local selection broadcaster for one workspace.
pub struct CursorPresence {
    session: Arc<SessionManager>,
    ttl_ms: i64,
    throttle_ms: u64,
    class_prefix: String,
    self_user_id: RwLock<Option<String>>,
    /// `file_id -> user_id -> entry`
    cursors: RwLock<HashMap<String, HashMap<String, CursorEntry>>>,
    names: RwLock<HashMap<String, String>>,
    throttles: Mutex<HashMap<String, SelectionThrottle>>,
    styles: StyleRegistry,
}

impl CursorPresence {
    /// Cursor channel bound to `session`, with TTL and throttle from `config`.
    pub fn new(config: &CollabConfig, session: Arc<SessionManager>) -> Self {
        Self {
            session,
            ttl_ms: i64::try_from(config.cursor_ttl_ms).unwrap_or(i64::MAX),
            throttle_ms: config.cursor_throttle_ms,
            class_prefix: config.cursor_class_prefix.clone(),
            self_user_id: RwLock::new(None),
            cursors: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
            throttles: Mutex::new(HashMap::new()),
            styles: StyleRegistry::new(),
        }
    }

    /// Set the acting user, whose own entry is never rendered.
    pub fn set_self_user(&self, user_id: Option<String>) {
        *self.self_user_id.write().unwrap() = user_id;
    }

    /// Fold a session event into the cursor map.
    pub fn handle_session_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Cursor {
                user_id,
                file_id,
                start,
                end,
                timestamp,
            } => self.apply_remote(
                file_id,
                CursorEntry {
                    user_id: user_id.clone(),
                    start: *start.min(end),
                    end: *start.max(end),
                    timestamp: *timestamp,
                },
            ),
            SessionEvent::CursorCleared { user_id, file_id } => self.clear_remote(file_id, user_id),
            SessionEvent::Disconnected => self.clear_all(),
            SessionEvent::Connected
            | SessionEvent::LeaderChanged { .. }
            | SessionEvent::FileActive { .. }
            | SessionEvent::FileSaved { .. } => {}
        }
    }

    /// Store (or overwrite) a remote user's cursor.
    pub fn apply_remote(&self, file_id: &str, entry: CursorEntry) {
        self.cursors
            .write()
            .unwrap()
            .entry(file_id.to_string())
            .or_default()
            .insert(entry.user_id.clone(), entry);
    }

    /// Remove a remote user's cursor immediately.
    pub fn clear_remote(&self, file_id: &str, user_id: &str) {
        let mut cursors = self.cursors.write().unwrap();
        if let Some(users) = cursors.get_mut(file_id) {
            users.remove(user_id);
        }
    }

    /// Drop every remote cursor.
    pub fn clear_all(&self) {
        self.cursors.write().unwrap().clear();
    }

    /// Replace the presence list: remember display names and drop cursors of
    /// users that went offline.
    pub fn set_online_users(&self, users: &[OnlineUser]) {
        {
            let mut names = self.names.write().unwrap();
            names.clear();
            names.extend(
                users
                    .iter()
                    .map(|user| (user.user_id.clone(), user.username.clone())),
            );
        }

        let names = self.names.read().unwrap();
        let mut cursors = self.cursors.write().unwrap();
        for users in cursors.values_mut() {
            users.retain(|user_id, _| names.contains_key(user_id));
        }
    }

    /// Stored entries of a file, including expired ones.
    pub fn cursors(&self, file_id: &str) -> Vec<CursorEntry> {
        self.cursors
            .read()
            .unwrap()
            .get(file_id)
            .map(|users| users.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Capture a local selection change.
    ///
    /// Returns the time (ms) at which the host should call
    /// [`CursorPresence::flush_due`].
    pub fn on_selection_change(
        &self,
        file_id: &str,
        widget: &dyn EditorWidget,
        anchor: TextPosition,
        head: TextPosition,
        now_ms: i64,
    ) -> i64 {
        let a = widget.offset_at(anchor);
        let b = widget.offset_at(head);
        let selection: Selection = (a.min(b), a.max(b));

        let mut throttles = self.throttles.lock().unwrap();
        throttles
            .entry(file_id.to_string())
            .or_insert_with(|| SelectionThrottle::new(self.throttle_ms))
            .record(selection, now_ms)
    }

    /// Broadcast every selection whose throttle window has closed.
    /// Returns the number of cursor messages sent.
    pub fn flush_due(&self, now_ms: i64) -> usize {
        let due: Vec<(String, Selection)> = {
            let mut throttles = self.throttles.lock().unwrap();
            throttles
                .iter_mut()
                .filter_map(|(file_id, throttle)| {
                    throttle.poll(now_ms).map(|sel| (file_id.clone(), sel))
                })
                .collect()
        };

        due.into_iter()
            .filter(|(file_id, (start, end))| self.session.broadcast_cursor(file_id, *start, *end))
            .count()
    }

    /// The editor lost focus: tell peers to drop this client's cursor now.
    pub fn on_blur(&self, file_id: &str) -> bool {
        if let Some(throttle) = self.throttles.lock().unwrap().get_mut(file_id) {
            throttle.reset();
        }
        self.session.broadcast_cursor_clear(file_id)
    }

    /// Compute carets and decorations for one render pass.
    pub fn render(&self, file_id: &str, widget: &dyn EditorWidget, now_ms: i64) -> CursorOverlay {
        let self_user = self.self_user_id.read().unwrap().clone();
        let mut entries: Vec<CursorEntry> = self
            .cursors(file_id)
            .into_iter()
            .filter(|entry| now_ms - entry.timestamp <= self.ttl_ms)
            .filter(|entry| self_user.as_deref() != Some(entry.user_id.as_str()))
            .collect();
        entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let names = self.names.read().unwrap();
        let mut overlay = CursorOverlay::default();
        for entry in entries {
            // Scrolled out of view: skip this pass, keep the entry.
            let Some(point) = widget.point_at(entry.end) else {
                continue;
            };

            if entry.start != entry.end {
                let (class_name, rule) = self.styles.ensure(&self.class_prefix, &entry.user_id);
                overlay.new_style_rules.extend(rule);
                overlay.decorations.push(SelectionDecoration {
                    user_id: entry.user_id.clone(),
                    from: entry.start,
                    to: entry.end,
                    class_name,
                });
            }

            overlay.carets.push(RemoteCaret {
                label: names
                    .get(&entry.user_id)
                    .cloned()
                    .unwrap_or_else(|| entry.user_id.clone()),
                color: user_color(&entry.user_id),
                user_id: entry.user_id,
                point,
            });
        }
        overlay
    }

    /// Drop all cursor state.
    pub fn teardown(&self) {
        self.clear_all();
        self.throttles.lock().unwrap().clear();
        self.styles.clear();
    }
}

impl std::fmt::Debug for CursorPresence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorPresence")
            .field("ttl_ms", &self.ttl_ms)
            .field("throttle_ms", &self.throttle_ms)
            .field("self_user_id", &self.self_user_id.read().unwrap())
            .finish_non_exhaustive()
    }
}
