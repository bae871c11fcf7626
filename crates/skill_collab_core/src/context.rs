//! Per-workspace collaboration context.
//!
//! [`CollabContext`] constructs and wires every component of one workspace
//! session: the document registry, the transport session, cursor presence,
//! and the save coordinator. Hosts create one with [`CollabContext::init`]
//! when a workspace opens and call [`CollabContext::teardown`] when it closes.
//!
//! # Example
//!
//! ```ignore
//! let ctx = CollabContext::init("app-1", CollabConfig::default(), deps);
//! let editor = ctx.open_editor(options);
//! editor.handle_local_change("new text");
//! let results = ctx.saves().save_all_dirty().await;
//! ctx.teardown();
//! ```

use std::sync::{Arc, Weak};

use crate::config::CollabConfig;
use crate::crdt::DocumentRegistry;
use crate::cursor::CursorPresence;
use crate::editing::{EditingSession, EditingSessionOptions};
use crate::listeners::ListenerId;
use crate::save::{
    ContentCache, SaveCoordinator, SaveOptions, SaveTrigger, SkillPersistence, Spawner,
};
use crate::session::{SessionEvent, SessionManager, SyncHandler};
use crate::store::DraftStore;
use crate::transport::TransportFactory;

/// External capabilities a context is built from.
#[derive(Clone)]
pub struct CollabDeps {
    /// Opens the workspace transport.
    pub transports: Arc<dyn TransportFactory>,
    /// Drafts, metadata, and dirty flags.
    pub drafts: Arc<dyn DraftStore>,
    /// Last persisted content per file.
    pub cache: Arc<dyn ContentCache>,
    /// Durable save endpoint.
    pub persistence: Arc<dyn SkillPersistence>,
    /// Runs saves started from synchronous callbacks.
    pub spawner: Spawner,
}

/// Everything collaboration needs for one workspace.
pub struct CollabContext {
    workspace_id: String,
    config: CollabConfig,
    drafts: Arc<dyn DraftStore>,
    session: Arc<SessionManager>,
    cursors: Arc<CursorPresence>,
    saves: Arc<SaveCoordinator>,
    spawner: Spawner,
    event_subscription: ListenerId,
}

impl CollabContext {
    /// Build and wire the components for `workspace_id`.
    ///
    /// Connects right away when collaboration is enabled.
    pub fn init(workspace_id: &str, config: CollabConfig, deps: CollabDeps) -> Self {
        let registry = Arc::new(DocumentRegistry::new());
        let session = SessionManager::new(deps.transports, registry);
        let cursors = Arc::new(CursorPresence::new(&config, Arc::clone(&session)));
        let saves = Arc::new(SaveCoordinator::new(
            config.clone(),
            Arc::clone(&session),
            Arc::clone(&deps.drafts),
            deps.cache,
            deps.persistence,
        ));
        saves.set_app_id(Some(workspace_id.to_string()));

        let weak_cursors = Arc::downgrade(&cursors);
        let weak_saves = Arc::downgrade(&saves);
        let event_subscription = session.subscribe(Arc::new(move |event: &SessionEvent| {
            if let Some(cursors) = weak_cursors.upgrade() {
                cursors.handle_session_event(event);
            }
            if let SessionEvent::FileSaved {
                file_id,
                content,
                metadata,
            } = event
                && let Some(saves) = weak_saves.upgrade()
            {
                saves.apply_remote_save(file_id, content, metadata.clone());
            }
        }));

        if config.enabled {
            session.connect(workspace_id);
        }
        log::info!(
            "[CollabContext] initialized workspace {} (collaboration {})",
            workspace_id,
            if config.enabled { "on" } else { "off" }
        );

        Self {
            workspace_id: workspace_id.to_string(),
            config,
            drafts: deps.drafts,
            session,
            cursors,
            saves,
            spawner: deps.spawner,
            event_subscription,
        }
    }

    /// The workspace this context serves.
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Configuration the context was built with.
    pub fn config(&self) -> &CollabConfig {
        &self.config
    }

    /// The transport session.
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Open documents.
    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        self.session.registry()
    }

    /// Cursor presence.
    pub fn cursors(&self) -> &Arc<CursorPresence> {
        &self.cursors
    }

    /// The save coordinator.
    pub fn saves(&self) -> &Arc<SaveCoordinator> {
        &self.saves
    }

    /// The draft store.
    pub fn drafts(&self) -> &Arc<dyn DraftStore> {
        &self.drafts
    }

    /// Create and mount an editing session in this workspace.
    ///
    /// Collaboration for the editor is on only if it is on for the workspace
    /// too. The editor's text is kept as save fallback, and
    /// [`EditingSession::teardown_with_flush`] queues a save on the context's spawner.
    pub fn open_editor(&self, mut options: EditingSessionOptions) -> EditingSession {
        options.enabled &= self.config.enabled;
        options.app_id = self.workspace_id.clone();
        let editor = EditingSession::new(Arc::clone(&self.session), Arc::clone(&self.drafts), options)
            .with_save_flush(&self.saves, Arc::clone(&self.spawner));
        editor.mount();
        editor
    }

    /// A sync handler that persists `file_id` when this client leads it.
    ///
    /// The save is spawned, never driven in place: the handler runs inside
    /// transport delivery, possibly while another save of the file is in flight.
    pub fn leader_sync_handler(&self, file_id: &str) -> SyncHandler {
        let saves: Weak<SaveCoordinator> = Arc::downgrade(&self.saves);
        let spawner = Arc::clone(&self.spawner);
        let file_id = file_id.to_string();
        Arc::new(move || {
            let Some(saves) = saves.upgrade() else {
                return;
            };
            let options = SaveOptions {
                trigger: SaveTrigger::SyncRequest,
                ..SaveOptions::default()
            };
            saves.spawn_save(&spawner, &file_id, options);
        })
    }

    /// Drop all workspace state and unbind the transport.
    pub fn teardown(&self) {
        self.session.unsubscribe(self.event_subscription);
        self.cursors.teardown();
        self.saves.teardown();
        self.session.teardown();
        log::info!("[CollabContext] tore down workspace {}", self.workspace_id);
    }
}

impl std::fmt::Debug for CollabContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabContext")
            .field("workspace_id", &self.workspace_id)
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
