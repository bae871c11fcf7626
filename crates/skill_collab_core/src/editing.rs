//! Editing-session adapter.
//!
//! One [`EditingSession`] bridges one editor instance to the replicated
//! document of its file:
//!
//! - local edits reported by the editor go into the document (and to the
//!   caller's `on_local_change`)
//! - merged remote text goes back to the editor and into the draft store
//!
//! Pushing remote text into the editor makes the editor report it back as if
//! the user had typed it. The adapter keeps that text in a one-shot
//! suppression slot and swallows the echo, so it is never re-broadcast.
//!
//! Two variants exist. The markdown variant additionally drops `files`
//! metadata entries whose reference token was deleted from the text.
//!
//! With a save target attached ([`EditingSession::with_save_flush`]) the
//! adapter keeps the editor's latest text registered as the file's save
//! fallback while mounted, and [`EditingSession::teardown_with_flush`]
//! revokes it and queues one last save.

use std::sync::{Arc, Mutex, Weak};

use crate::crdt::{TextChange, UpdateOrigin};
use crate::listeners::ListenerId;
use crate::references;
use crate::save::{SaveCoordinator, SaveOptions, SaveTrigger, Spawner};
use crate::session::{SessionManager, SyncHandler};
use crate::store::DraftStore;

/// Text callback (local change forwarding, remote text push).
pub type TextCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Which editor the session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorKind {
    /// Plain text / code editor.
    #[default]
    Code,
    /// Rich markdown editor with inline file references.
    Markdown,
}

/// Construction options of an [`EditingSession`].
#[derive(Clone)]
pub struct EditingSessionOptions {
    /// Workspace the file lives in.
    pub app_id: String,
    /// `None` for an editor not bound to a file (nothing is replicated).
    pub file_id: Option<String>,
    /// Whether collaboration is on for this editor.
    pub enabled: bool,
    /// Last persisted content, used to seed the document.
    pub initial_content: String,
    /// Code or markdown editor.
    pub kind: EditorKind,
    /// Receives every local change that was not an echo.
    pub on_local_change: TextCallback,
    /// Run when this client, as leader, is asked to persist the file.
    pub on_leader_sync: SyncHandler,
    /// Pushes merged remote text into the editor widget.
    pub on_remote_text: Option<TextCallback>,
}

impl std::fmt::Debug for EditingSessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSessionOptions")
            .field("app_id", &self.app_id)
            .field("file_id", &self.file_id)
            .field("enabled", &self.enabled)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct EchoState {
    /// One-shot: the last text pushed into the editor.
    suppressed: Option<String>,
    /// Latest text this editor holds.
    last_text: String,
}

#[derive(Debug, Clone, Copy)]
struct Subscriptions {
    remote_text: Option<ListenerId>,
    sync: ListenerId,
}

/// Where the editor's latest text goes as save fallback.
#[derive(Clone)]
struct SaveFlush {
    saves: Weak<SaveCoordinator>,
    spawner: Spawner,
}

impl SaveFlush {
    fn refresh(&self, file_id: &str, text: &str, drafts: &dyn DraftStore) {
        if let Some(saves) = self.saves.upgrade() {
            saves.register_fallback(file_id, text.to_string(), drafts.file_metadata(file_id));
        }
    }
}

/// Bridge between one editor instance and its replicated document.
pub struct EditingSession {
    session: Arc<SessionManager>,
    drafts: Arc<dyn DraftStore>,
    options: EditingSessionOptions,
    echo: Arc<Mutex<EchoState>>,
    mounted: Mutex<Option<Subscriptions>>,
    flush: Option<SaveFlush>,
}

impl EditingSession {
    /// Create an unmounted session.
    pub fn new(
        session: Arc<SessionManager>,
        drafts: Arc<dyn DraftStore>,
        options: EditingSessionOptions,
    ) -> Self {
        let echo = EchoState {
            suppressed: None,
            last_text: options.initial_content.clone(),
        };
        Self {
            session,
            drafts,
            options,
            echo: Arc::new(Mutex::new(echo)),
            mounted: Mutex::new(None),
            flush: None,
        }
    }

    /// Keep the latest text registered as save fallback with `saves`, and
    /// spawn the unmount save on `spawner`. Call before [`EditingSession::mount`].
    pub fn with_save_flush(mut self, saves: &Arc<SaveCoordinator>, spawner: Spawner) -> Self {
        self.flush = Some(SaveFlush {
            saves: Arc::downgrade(saves),
            spawner,
        });
        self
    }

    /// Create and mount in one step.
    pub fn mount_new(
        session: Arc<SessionManager>,
        drafts: Arc<dyn DraftStore>,
        options: EditingSessionOptions,
    ) -> Self {
        let editing = Self::new(session, drafts, options);
        editing.mount();
        editing
    }

    /// The file this editor is bound to.
    pub fn file_id(&self) -> Option<&str> {
        self.options.file_id.as_deref()
    }

    /// Whether edits currently flow through a replicated document.
    pub fn is_collaborating(&self) -> bool {
        self.mounted.lock().unwrap().is_some()
    }

    /// Open the file, mark it active, and subscribe to remote text and sync requests.
    ///
    /// Does nothing when unbound or already mounted. When disabled only the
    /// save fallback is registered.
    pub fn mount(&self) {
        let Some(file_id) = self.options.file_id.clone() else {
            return;
        };
        if let Some(flush) = &self.flush {
            let text = self.echo.lock().unwrap().last_text.clone();
            flush.refresh(&file_id, &text, self.drafts.as_ref());
        }
        if !self.options.enabled {
            return;
        }
        let mut mounted = self.mounted.lock().unwrap();
        if mounted.is_some() {
            return;
        }

        self.session
            .open_file(&self.options.app_id, &file_id, &self.options.initial_content);
        self.session.set_active_file(&file_id, true);

        let echo = Arc::clone(&self.echo);
        let drafts = Arc::clone(&self.drafts);
        let on_remote_text = self.options.on_remote_text.clone();
        let flush = self.flush.clone();
        let remote_file_id = file_id.clone();
        let remote_text = self.session.registry().subscribe(
            &file_id,
            Arc::new(move |change: &TextChange| {
                if change.origin != UpdateOrigin::Remote {
                    return;
                }
                handle_remote_text(
                    &remote_file_id,
                    &change.text,
                    &echo,
                    drafts.as_ref(),
                    on_remote_text.as_ref(),
                    flush.as_ref(),
                );
            }),
        );

        let sync = self
            .session
            .register_sync_handler(&file_id, Arc::clone(&self.options.on_leader_sync));

        *mounted = Some(Subscriptions { remote_text, sync });
        log::debug!("[EditingSession] mounted {} ({:?})", file_id, self.options.kind);
    }

    /// Handle a change reported by the editor widget.
    pub fn handle_local_change(&self, value: &str) {
        let collaborating = self.is_collaborating();
        let file_id = match (&self.options.file_id, collaborating) {
            (Some(file_id), true) => file_id,
            (file_id, false) => {
                self.echo.lock().unwrap().last_text = value.to_string();
                if let (Some(file_id), Some(flush)) = (file_id, &self.flush) {
                    flush.refresh(file_id, value, self.drafts.as_ref());
                }
                (self.options.on_local_change)(value);
                return;
            }
            (None, true) => {
                (self.options.on_local_change)(value);
                return;
            }
        };

        {
            let mut echo = self.echo.lock().unwrap();
            let suppressed = echo.suppressed.take();
            if suppressed.as_deref() == Some(value) {
                log::trace!("[EditingSession] swallowed echo for {}", file_id);
                return;
            }
            echo.last_text = value.to_string();
        }

        if let Err(e) = self.session.registry().update_text(file_id, value) {
            log::warn!("[EditingSession] failed to apply local edit to {}: {}", file_id, e);
        }

        if self.options.kind == EditorKind::Markdown {
            self.prune_file_references(file_id, value);
        }
        if let Some(flush) = &self.flush {
            flush.refresh(file_id, value, self.drafts.as_ref());
        }
        (self.options.on_local_change)(value);
    }

    fn prune_file_references(&self, file_id: &str, content: &str) {
        let Some(mut metadata) = self.drafts.file_metadata(file_id) else {
            return;
        };
        if references::prune_files(&mut metadata, content) {
            self.drafts.set_draft_metadata(file_id, metadata);
        }
    }

    /// Revoke the save fallback, unsubscribe, mark the file inactive, and close it.
    pub fn teardown(&self) {
        let Some(file_id) = self.options.file_id.as_deref() else {
            return;
        };
        if let Some(saves) = self.flush.as_ref().and_then(|flush| flush.saves.upgrade()) {
            saves.unregister_fallback(file_id);
        }
        let Some(subscriptions) = self.mounted.lock().unwrap().take() else {
            return;
        };

        if let Some(id) = subscriptions.remote_text {
            self.session.registry().unsubscribe(file_id, id);
        }
        self.session.unregister_sync_handler(file_id, subscriptions.sync);
        self.session.close_file(file_id);
        log::debug!("[EditingSession] torn down {}", file_id);
    }

    /// Queue a save of the latest text, then tear down.
    ///
    /// The text goes along as fallback content, so the save resolves even
    /// when neither a draft nor a cache entry exists. Without a save target
    /// this is [`EditingSession::teardown`].
    pub fn teardown_with_flush(&self) {
        let target = self.options.file_id.as_deref().zip(self.flush.as_ref());
        if let Some((file_id, flush)) = target
            && let Some(saves) = flush.saves.upgrade()
        {
            saves.unregister_fallback(file_id);
            let options = SaveOptions {
                fallback_content: Some(self.echo.lock().unwrap().last_text.clone()),
                fallback_metadata: self.drafts.file_metadata(file_id),
                trigger: SaveTrigger::Ambient,
            };
            saves.spawn_save(&flush.spawner, file_id, options);
        }
        self.teardown();
    }
}

impl Drop for EditingSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("options", &self.options)
            .field("collaborating", &self.is_collaborating())
            .finish_non_exhaustive()
    }
}

fn handle_remote_text(
    file_id: &str,
    text: &str,
    echo: &Mutex<EchoState>,
    drafts: &dyn DraftStore,
    on_remote_text: Option<&TextCallback>,
    flush: Option<&SaveFlush>,
) {
    {
        let mut echo = echo.lock().unwrap();
        echo.suppressed = Some(text.to_string());
        echo.last_text = text.to_string();
    }
    if let Some(flush) = flush {
        flush.refresh(file_id, text, drafts);
    }

    // Back at the saved baseline: not dirty.
    if drafts.persisted_content(file_id).as_deref() == Some(text) {
        drafts.clear_draft_content(file_id);
    } else {
        drafts.set_draft_content(file_id, text.to_string());
    }
    drafts.pin_tab(file_id);

    if let Some(push) = on_remote_text {
        push(text);
    }
}
