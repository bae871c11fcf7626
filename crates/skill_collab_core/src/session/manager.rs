//! Transport session manager and leader/sync coordinator.
//!
//! `SessionManager` owns the single transport handle of the current workspace
//! and routes every inbound event:
//!
//! - `skill_update` is merged into the [`DocumentRegistry`]
//! - `skill_status` updates the [`LeaderTable`]
//! - `collaboration_update` envelopes are decoded into [`CollaborationMessage`]
//!   and dispatched exhaustively (resync and sync requests are answered only
//!   when this client leads the file)
//! - `connect`/`disconnect` drive the [`ConnectionState`] machine, which
//!   re-announces the active file, republishes locally edited documents, and
//!   flushes the pending-resync set on the edge into `Connected`
//!
//! Cursor, presence, and file-saved messages are surfaced as [`SessionEvent`]s
//! for the cursor channel and the save coordinator.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use indexmap::IndexSet;
use serde_json::Value;

use super::leader::LeaderTable;
use super::state::{ConnectionAction, ConnectionEvent, ConnectionState};
use crate::crdt::{DocumentRegistry, SkillDoc};
use crate::error::CollabError;
use crate::listeners::{ListenerId, ListenerRegistry};
use crate::protocol::{
    CollaborationEnvelope, CollaborationMessage, OutboundEvent, SkillStatusPayload,
    SkillUpdatePayload, TransportEvent, now_ms,
};
use crate::transport::{Transport, TransportFactory};

/// Events surfaced to the rest of the workspace context.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The transport reported `connect`.
    Connected,
    /// The transport reported `disconnect`; leadership was reset.
    Disconnected,
    /// The server flipped this client's leader flag for a file.
    LeaderChanged {
        /// File whose leadership changed.
        file_id: String,
        /// New flag.
        is_leader: bool,
    },
    /// A peer moved its selection.
    Cursor {
        /// Peer that moved.
        user_id: String,
        /// File the selection is in.
        file_id: String,
        /// Anchor offset.
        start: usize,
        /// Head offset.
        end: usize,
        /// Local receive time in ms.
        timestamp: i64,
    },
    /// A peer's editor lost focus.
    CursorCleared {
        /// Peer whose cursor is gone.
        user_id: String,
        /// File it was in.
        file_id: String,
    },
    /// A peer focused or left a file.
    FileActive {
        /// Sender, when the server stamped one.
        user_id: Option<String>,
        /// File in question.
        file_id: String,
        /// False when the peer left.
        active: bool,
    },
    /// The leader persisted a file.
    FileSaved {
        /// File that was persisted.
        file_id: String,
        /// Persisted text.
        content: String,
        /// Normalized metadata, if any.
        metadata: Option<Value>,
    },
}

/// Callback invoked when this client, as leader, is asked to persist a file.
pub type SyncHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SessionInner {
    workspace_id: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    listener_id: Option<ListenerId>,
    state: ConnectionState,
    active_file: Option<String>,
    /// Files opened while offline, in open order.
    pending_resync: IndexSet<String>,
}

/// One transport session per workspace, plus the leader/sync coordination on top of it.
pub struct SessionManager {
    factory: Arc<dyn TransportFactory>,
    registry: Arc<DocumentRegistry>,
    leaders: LeaderTable,
    sync_handlers: RwLock<HashMap<String, Arc<ListenerRegistry<()>>>>,
    events: ListenerRegistry<SessionEvent>,
    inner: RwLock<SessionInner>,
    self_ref: Weak<SessionManager>,
}

impl SessionManager {
    /// Create a manager. Local deltas of every document in `registry` are sent
    /// over the current transport.
    pub fn new(factory: Arc<dyn TransportFactory>, registry: Arc<DocumentRegistry>) -> Arc<Self> {
        let manager = Arc::new_cyclic(|weak: &Weak<SessionManager>| SessionManager {
            factory,
            registry,
            leaders: LeaderTable::new(),
            sync_handlers: RwLock::new(HashMap::new()),
            events: ListenerRegistry::new(),
            inner: RwLock::new(SessionInner::default()),
            self_ref: weak.clone(),
        });

        let weak = Arc::downgrade(&manager);
        manager
            .registry
            .set_local_sink(Some(Arc::new(move |file_id: &str, update: &[u8]| {
                if let Some(manager) = weak.upgrade() {
                    manager.send_update(file_id, update.to_vec(), false);
                }
            })));

        manager
    }

    /// The document registry this manager feeds.
    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.registry
    }

    /// Return the transport for `workspace_id`, binding listeners if needed.
    ///
    /// Reuses the current handle when neither the workspace nor the handle
    /// changed. Switching workspaces first drops all per-workspace state.
    pub fn connect(&self, workspace_id: &str) -> Arc<dyn Transport> {
        let handle = self.factory.connect(workspace_id);

        let previous = {
            let mut inner = self.inner.write().unwrap();
            let same_workspace = inner.workspace_id.as_deref() == Some(workspace_id);
            let same_handle = inner
                .transport
                .as_ref()
                .is_some_and(|current| same_transport(current, &handle));

            if same_workspace && same_handle {
                return handle;
            }

            if !same_workspace && inner.workspace_id.is_some() {
                log::info!(
                    "[SessionManager] switching workspace {:?} -> {}",
                    inner.workspace_id,
                    workspace_id
                );
                inner.active_file = None;
                inner.pending_resync.clear();
                self.registry.clear();
                self.leaders.clear();
                self.sync_handlers.write().unwrap().clear();
            }

            let previous = inner.transport.take().zip(inner.listener_id.take());
            inner.workspace_id = Some(workspace_id.to_string());
            inner.transport = Some(Arc::clone(&handle));
            inner.state = inner.state.transition(ConnectionEvent::Bind).0;
            previous
        };

        if let Some((old, id)) = previous {
            old.off(id);
        }

        let weak = self.self_ref.clone();
        let id = handle.on(Arc::new(move |event: &TransportEvent| {
            if let Some(manager) = weak.upgrade() {
                manager.handle_event(event);
            }
        }));
        self.inner.write().unwrap().listener_id = Some(id);
        log::info!("[SessionManager] bound transport for workspace {}", workspace_id);

        if handle.is_connected() {
            self.on_connected();
        }
        handle
    }

    /// Workspace of the current session.
    pub fn workspace_id(&self) -> Option<String> {
        self.inner.read().unwrap().workspace_id.clone()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.read().unwrap().state
    }

    /// Whether the bound transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport().is_some_and(|t| t.is_connected())
    }

    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.inner.read().unwrap().transport.clone()
    }

    /// Open a file in `workspace_id` and ask the leader for a snapshot.
    ///
    /// While offline the resync request is queued and sent once on the next
    /// connect.
    pub fn open_file(&self, workspace_id: &str, file_id: &str, initial_content: &str) -> Arc<SkillDoc> {
        self.connect(workspace_id);
        let doc = self.registry.open(workspace_id, file_id, initial_content);

        if self.is_connected() {
            self.send_message(&CollaborationMessage::SkillResyncRequest {
                file_id: file_id.to_string(),
            });
        } else {
            log::debug!("[SessionManager] offline, queueing resync for {}", file_id);
            self.inner
                .write()
                .unwrap()
                .pending_resync
                .insert(file_id.to_string());
        }
        doc
    }

    /// Mark inactive and close a file. The document itself stays in the registry.
    pub fn close_file(&self, file_id: &str) {
        self.set_active_file(file_id, false);
        self.inner.write().unwrap().pending_resync.shift_remove(file_id);
        self.registry.close(file_id);
    }

    /// Record (and announce) which file this client is focused on.
    pub fn set_active_file(&self, file_id: &str, active: bool) {
        self.registry.set_active(file_id, active);
        {
            let mut inner = self.inner.write().unwrap();
            if active {
                inner.active_file = Some(file_id.to_string());
            } else if inner.active_file.as_deref() == Some(file_id) {
                inner.active_file = None;
            }
        }

        if self.is_connected() {
            self.send_message(&CollaborationMessage::SkillFileActive {
                file_id: file_id.to_string(),
                active,
            });
        }
    }

    /// The file this client is focused on.
    pub fn active_file(&self) -> Option<String> {
        self.inner.read().unwrap().active_file.clone()
    }

    /// Files waiting for a resync request.
    pub fn pending_resync(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap()
            .pending_resync
            .iter()
            .cloned()
            .collect()
    }

    /// Whether this client leads `file_id`.
    pub fn is_leader(&self, file_id: &str) -> bool {
        self.leaders.is_leader(file_id)
    }

    /// The leader table, for inspection.
    pub fn leaders(&self) -> &LeaderTable {
        &self.leaders
    }

    /// Register a handler run when a sync request for `file_id` reaches this client as leader.
    pub fn register_sync_handler(&self, file_id: &str, handler: SyncHandler) -> ListenerId {
        let registry = {
            let mut handlers = self.sync_handlers.write().unwrap();
            Arc::clone(handlers.entry(file_id.to_string()).or_default())
        };
        registry.subscribe(Arc::new(move |_: &()| handler()))
    }

    /// Remove a sync handler.
    pub fn unregister_sync_handler(&self, file_id: &str, id: ListenerId) -> bool {
        let mut handlers = self.sync_handlers.write().unwrap();
        let Some(registry) = handlers.get(file_id) else {
            return false;
        };
        let removed = registry.unsubscribe(id);
        if registry.is_empty() {
            handlers.remove(file_id);
        }
        removed
    }

    /// Ask the leader of `file_id` to persist. Returns `false` if offline.
    pub fn request_sync(&self, file_id: &str) -> bool {
        self.send_message(&CollaborationMessage::SkillSyncRequest {
            file_id: file_id.to_string(),
        })
    }

    /// Broadcast the local selection.
    pub fn broadcast_cursor(&self, file_id: &str, start: usize, end: usize) -> bool {
        self.send_message(&CollaborationMessage::SkillCursor {
            file_id: file_id.to_string(),
            start,
            end,
        })
    }

    /// Tell peers to drop this client's cursor.
    pub fn broadcast_cursor_clear(&self, file_id: &str) -> bool {
        self.send_message(&CollaborationMessage::SkillCursorClear {
            file_id: file_id.to_string(),
        })
    }

    /// Tell followers that a file was persisted.
    pub fn broadcast_file_saved(&self, file_id: &str, content: &str, metadata: Option<Value>) -> bool {
        self.send_message(&CollaborationMessage::SkillFileSaved {
            file_id: file_id.to_string(),
            content: content.to_string(),
            metadata,
        })
    }

    /// Subscribe to session events.
    pub fn subscribe(&self, listener: Arc<dyn Fn(&SessionEvent) + Send + Sync>) -> ListenerId {
        self.events.subscribe(listener)
    }

    /// Remove a session event subscription.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Unbind the transport and drop all per-workspace state.
    pub fn teardown(&self) {
        let previous = {
            let mut inner = self.inner.write().unwrap();
            let previous = inner.transport.take().zip(inner.listener_id.take());
            *inner = SessionInner::default();
            previous
        };
        if let Some((transport, id)) = previous {
            transport.off(id);
        }

        self.registry.clear();
        self.leaders.clear();
        self.sync_handlers.write().unwrap().clear();
        self.events.clear();
        log::info!("[SessionManager] session torn down");
    }

    /// Route one inbound transport event.
    pub fn handle_event(&self, event: &TransportEvent) {
        match event {
            TransportEvent::Connect => self.on_connected(),
            TransportEvent::Disconnect => self.on_disconnected(),
            TransportEvent::SkillUpdate(payload) => {
                self.registry
                    .apply_remote_update(&payload.file_id, &payload.update, payload.is_snapshot);
            }
            TransportEvent::SkillStatus(SkillStatusPayload { file_id, is_leader }) => {
                if self.leaders.set(file_id, *is_leader) {
                    log::info!(
                        "[SessionManager] leader for {} is now {}",
                        file_id,
                        is_leader
                    );
                    self.events.emit(&SessionEvent::LeaderChanged {
                        file_id: file_id.clone(),
                        is_leader: *is_leader,
                    });
                }
            }
            TransportEvent::CollaborationUpdate(envelope) => self.handle_envelope(envelope),
        }
    }

    fn handle_envelope(&self, envelope: &CollaborationEnvelope) {
        let message = match CollaborationMessage::try_from(envelope) {
            Ok(message) => message,
            // The channel is shared with the workflow graph's own messages.
            Err(CollabError::UnknownMessage(kind)) => {
                log::trace!("[SessionManager] ignoring envelope type {}", kind);
                return;
            }
            Err(e) => {
                log::warn!("[SessionManager] dropping malformed envelope: {}", e);
                return;
            }
        };

        let user_id = envelope.user_id.clone();
        match message {
            CollaborationMessage::SkillResyncRequest { file_id } => self.answer_resync(&file_id),
            CollaborationMessage::SkillSyncRequest { file_id } => self.run_sync_handlers(&file_id),
            CollaborationMessage::SkillFileActive { file_id, active } => {
                self.events.emit(&SessionEvent::FileActive {
                    user_id,
                    file_id,
                    active,
                });
            }
            CollaborationMessage::SkillCursor {
                file_id,
                start,
                end,
            } => {
                let Some(user_id) = user_id else {
                    log::debug!("[SessionManager] cursor without sender for {}", file_id);
                    return;
                };
                self.events.emit(&SessionEvent::Cursor {
                    user_id,
                    file_id,
                    start,
                    end,
                    timestamp: now_ms(),
                });
            }
            CollaborationMessage::SkillCursorClear { file_id } => {
                if let Some(user_id) = user_id {
                    self.events
                        .emit(&SessionEvent::CursorCleared { user_id, file_id });
                }
            }
            CollaborationMessage::SkillFileSaved {
                file_id,
                content,
                metadata,
            } => {
                self.events.emit(&SessionEvent::FileSaved {
                    file_id,
                    content,
                    metadata,
                });
            }
        }
    }

    fn answer_resync(&self, file_id: &str) {
        if !self.leaders.is_leader(file_id) {
            log::debug!("[SessionManager] not leader for {}, ignoring resync", file_id);
            return;
        }
        let Some(snapshot) = self.registry.snapshot(file_id) else {
            log::debug!("[SessionManager] resync for unopened file {}", file_id);
            return;
        };
        log::debug!("[SessionManager] answering resync for {}", file_id);
        self.send_update(file_id, snapshot, true);
    }

    fn run_sync_handlers(&self, file_id: &str) {
        if !self.leaders.is_leader(file_id) {
            return;
        }
        let handlers = self.sync_handlers.read().unwrap().get(file_id).cloned();
        match handlers {
            Some(handlers) if !handlers.is_empty() => {
                let count = handlers.emit(&());
                log::debug!("[SessionManager] ran {} sync handler(s) for {}", count, file_id);
            }
            _ => log::debug!("[SessionManager] no sync handler for {}", file_id),
        }
    }

    fn on_connected(&self) {
        let actions = {
            let mut inner = self.inner.write().unwrap();
            let (state, actions) = inner.state.transition(ConnectionEvent::Connected);
            inner.state = state;
            actions
        };

        for action in actions {
            match action {
                ConnectionAction::ReassertActiveFile => {
                    if let Some(file_id) = self.active_file() {
                        self.send_message(&CollaborationMessage::SkillFileActive {
                            file_id,
                            active: true,
                        });
                    }
                }
                ConnectionAction::PublishLocalState => self.publish_local_state(),
                ConnectionAction::FlushPendingResync => {
                    let pending = std::mem::take(&mut self.inner.write().unwrap().pending_resync);
                    for file_id in pending {
                        if self.registry.is_open(&file_id) {
                            self.send_message(&CollaborationMessage::SkillResyncRequest { file_id });
                        }
                    }
                }
            }
        }
        self.events.emit(&SessionEvent::Connected);
    }

    /// Send the full state of every locally edited document as a mergeable update.
    ///
    /// Deltas made while offline were dropped, and later deltas build on them.
    fn publish_local_state(&self) {
        for file_id in self.registry.open_files() {
            let Some(doc) = self.registry.get(&file_id) else {
                continue;
            };
            if doc.is_locally_edited() {
                log::debug!("[SessionManager] republishing local state of {}", file_id);
                self.send_update(&file_id, doc.encode_snapshot(), false);
            }
        }
    }

    fn on_disconnected(&self) {
        {
            let mut inner = self.inner.write().unwrap();
            inner.state = inner.state.transition(ConnectionEvent::Disconnected).0;
        }
        // Leadership is reassigned by the server after reconnect.
        let lost = self.leaders.led_files();
        self.leaders.clear();
        log::info!(
            "[SessionManager] disconnected, dropped leadership of {} file(s)",
            lost.len()
        );
        for file_id in lost {
            self.events.emit(&SessionEvent::LeaderChanged {
                file_id,
                is_leader: false,
            });
        }
        self.events.emit(&SessionEvent::Disconnected);
    }

    fn send_update(&self, file_id: &str, update: Vec<u8>, is_snapshot: bool) {
        let Some(transport) = self.transport().filter(|t| t.is_connected()) else {
            log::debug!("[SessionManager] offline, dropping update for {}", file_id);
            return;
        };
        transport.emit(OutboundEvent::SkillUpdate(SkillUpdatePayload {
            file_id: file_id.to_string(),
            update,
            is_snapshot,
        }));
    }

    fn send_message(&self, message: &CollaborationMessage) -> bool {
        let Some(transport) = self.transport().filter(|t| t.is_connected()) else {
            return false;
        };
        match message.to_envelope(now_ms()) {
            Ok(envelope) => {
                transport.emit(OutboundEvent::CollaborationEvent(envelope));
                true
            }
            Err(e) => {
                log::warn!("[SessionManager] failed to encode {}: {}", message.kind(), e);
                false
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().unwrap();
        f.debug_struct("SessionManager")
            .field("workspace_id", &inner.workspace_id)
            .field("state", &inner.state)
            .field("active_file", &inner.active_file)
            .field("pending_resync", &inner.pending_resync)
            .finish_non_exhaustive()
    }
}

fn same_transport(a: &Arc<dyn Transport>, b: &Arc<dyn Transport>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockTransport, MockTransportFactory};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup(connected: bool) -> (Arc<SessionManager>, MockTransportFactory) {
        let factory = MockTransportFactory::new(connected);
        let manager = SessionManager::new(
            Arc::new(factory.clone()),
            Arc::new(DocumentRegistry::new()),
        );
        (manager, factory)
    }

    fn inbound(transport: &MockTransport, message: CollaborationMessage, user_id: Option<&str>) {
        let mut envelope = message.to_envelope(1).unwrap();
        envelope.user_id = user_id.map(str::to_string);
        transport.deliver(TransportEvent::CollaborationUpdate(envelope));
    }

    fn status(transport: &MockTransport, file_id: &str, is_leader: bool) {
        transport.deliver(TransportEvent::SkillStatus(SkillStatusPayload {
            file_id: file_id.to_string(),
            is_leader,
        }));
    }

    #[test]
    fn test_connect_reuses_handle() {
        let (manager, factory) = setup(true);
        let first = manager.connect("app-1");
        let second = manager.connect("app-1");

        assert!(same_transport(&first, &second));
        assert_eq!(factory.transport("app-1").listener_count(), 1);
        assert_eq!(manager.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn test_replaced_handle_is_rebound() {
        let (manager, factory) = setup(true);
        manager.connect("app-1");
        let old = factory.transport("app-1");

        factory.replace("app-1");
        manager.connect("app-1");

        assert_eq!(old.listener_count(), 0);
        assert_eq!(factory.transport("app-1").listener_count(), 1);
    }

    #[test]
    fn test_workspace_switch_drops_state() {
        let (manager, factory) = setup(true);
        manager.open_file("app-1", "f", "text");
        manager.set_active_file("f", true);
        status(&factory.transport("app-1"), "f", true);
        manager.register_sync_handler("f", Arc::new(|| {}));

        manager.connect("app-2");

        assert!(!manager.registry().is_open("f"));
        assert!(!manager.is_leader("f"));
        assert_eq!(manager.active_file(), None);
        assert_eq!(factory.transport("app-1").listener_count(), 0);
    }

    #[test]
    fn test_open_while_connected_requests_resync() {
        let (manager, factory) = setup(true);
        manager.open_file("app-1", "f", "");

        let sent = factory.transport("app-1").sent_messages();
        assert_eq!(
            sent,
            vec![CollaborationMessage::SkillResyncRequest {
                file_id: "f".to_string()
            }]
        );
    }

    #[test]
    fn test_pending_resync_flushed_once_on_connect() {
        let (manager, factory) = setup(false);
        manager.open_file("app-1", "f", "");
        manager.open_file("app-1", "g", "");
        manager.set_active_file("g", true);
        let transport = factory.transport("app-1");
        assert!(transport.sent().is_empty());
        assert_eq!(manager.pending_resync(), vec!["f", "g"]);

        transport.set_connected(true);
        transport.deliver(TransportEvent::Connect);
        transport.deliver(TransportEvent::Connect);

        let sent = transport.sent_messages();
        assert_eq!(
            sent,
            vec![
                CollaborationMessage::SkillFileActive {
                    file_id: "g".to_string(),
                    active: true
                },
                CollaborationMessage::SkillResyncRequest {
                    file_id: "f".to_string()
                },
                CollaborationMessage::SkillResyncRequest {
                    file_id: "g".to_string()
                },
            ]
        );
        assert!(manager.pending_resync().is_empty());
    }

    #[test]
    fn test_reconnect_republishes_offline_edits() {
        let (manager, factory) = setup(true);
        manager.open_file("app-1", "edited", "base");
        manager.open_file("app-1", "untouched", "base");
        let transport = factory.transport("app-1");
        transport.set_connected(false);
        transport.deliver(TransportEvent::Disconnect);

        manager.registry().update_text("edited", "base, offline").unwrap();
        assert!(transport.sent_updates().is_empty());

        transport.set_connected(true);
        transport.deliver(TransportEvent::Connect);

        let updates = transport.sent_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].file_id, "edited");
        assert!(!updates[0].is_snapshot);

        let peer = SkillDoc::seeded("edited", "", None);
        peer.apply_update(&updates[0].update, false).unwrap();
        assert_eq!(peer.text(), "base, offline");
    }

    #[test]
    fn test_resync_answered_only_by_leader() {
        let (manager, factory) = setup(true);
        manager.open_file("app-1", "f", "leader text");
        let transport = factory.transport("app-1");
        transport.clear_sent();

        let request = CollaborationMessage::SkillResyncRequest {
            file_id: "f".to_string(),
        };
        inbound(&transport, request.clone(), Some("peer"));
        assert!(transport.sent().is_empty());

        status(&transport, "f", true);
        inbound(&transport, request, Some("peer"));
        let updates = transport.sent_updates();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].is_snapshot);
        assert_eq!(updates[0].file_id, "f");
    }

    #[test]
    fn test_sync_request_runs_handlers_in_order_for_leader() {
        let (manager, factory) = setup(true);
        manager.open_file("app-1", "f", "");
        let transport = factory.transport("app-1");
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..2 {
            let order = Arc::clone(&order);
            manager.register_sync_handler("f", Arc::new(move || order.lock().unwrap().push(n)));
        }

        let request = CollaborationMessage::SkillSyncRequest {
            file_id: "f".to_string(),
        };
        inbound(&transport, request.clone(), None);
        assert!(order.lock().unwrap().is_empty());

        status(&transport, "f", true);
        inbound(&transport, request, None);
        assert_eq!(*order.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_unregister_sync_handler() {
        let (manager, factory) = setup(true);
        let transport = factory.transport("app-1");
        manager.connect("app-1");
        status(&transport, "f", true);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let id = manager.register_sync_handler(
            "f",
            Arc::new(move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(manager.unregister_sync_handler("f", id));
        assert!(!manager.unregister_sync_handler("f", id));
        inbound(
            &transport,
            CollaborationMessage::SkillSyncRequest {
                file_id: "f".to_string(),
            },
            None,
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_local_edit_is_sent_as_delta() {
        let (manager, factory) = setup(true);
        manager.open_file("app-1", "f", "abc");
        manager.registry().update_text("f", "abcd").unwrap();

        let updates = factory.transport("app-1").sent_updates();
        assert_eq!(updates.len(), 1);
        assert!(!updates[0].is_snapshot);
    }

    #[test]
    fn test_disconnect_resets_leadership_and_emits_events() {
        let (manager, factory) = setup(true);
        manager.connect("app-1");
        let transport = factory.transport("app-1");
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        manager.subscribe(Arc::new(move |event: &SessionEvent| {
            events_clone.lock().unwrap().push(event.clone());
        }));

        status(&transport, "f", true);
        status(&transport, "f", true);
        transport.set_connected(false);
        transport.deliver(TransportEvent::Disconnect);

        assert!(!manager.is_leader("f"));
        assert_eq!(manager.connection_state(), ConnectionState::Disconnected);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                SessionEvent::LeaderChanged {
                    file_id: "f".to_string(),
                    is_leader: true
                },
                SessionEvent::LeaderChanged {
                    file_id: "f".to_string(),
                    is_leader: false
                },
                SessionEvent::Disconnected,
            ]
        );
    }

    #[test]
    fn test_cursor_envelope_becomes_event() {
        let (manager, factory) = setup(true);
        manager.connect("app-1");
        let transport = factory.transport("app-1");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        manager.subscribe(Arc::new(move |event: &SessionEvent| {
            seen_clone.lock().unwrap().push(event.clone());
        }));

        let cursor = CollaborationMessage::SkillCursor {
            file_id: "f".to_string(),
            start: 1,
            end: 4,
        };
        inbound(&transport, cursor.clone(), None);
        inbound(&transport, cursor, Some("user-b"));
        let unknown = CollaborationEnvelope {
            kind: "graph_update".to_string(),
            data: Value::Null,
            timestamp: 1,
            user_id: None,
        };
        transport.deliver(TransportEvent::CollaborationUpdate(unknown));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            &seen[0],
            SessionEvent::Cursor { user_id, start: 1, end: 4, .. } if user_id == "user-b"
        ));
    }

    #[test]
    fn test_teardown_unbinds() {
        let (manager, factory) = setup(true);
        manager.open_file("app-1", "f", "");
        manager.teardown();

        assert_eq!(factory.transport("app-1").listener_count(), 0);
        assert_eq!(manager.workspace_id(), None);
        assert!(!manager.is_connected());
        assert!(manager.registry().is_empty());
    }
}
