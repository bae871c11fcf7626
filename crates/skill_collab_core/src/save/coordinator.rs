//! Save coordinator.
//!
//! `SaveCoordinator` decides whether this client may persist a file, builds
//! the best available [`SaveSnapshot`], and persists it through the host's
//! [`SkillPersistence`] endpoint. Saves of one file are strictly serialized
//! through a per-file FIFO lock, so at most one persistence call per file is
//! in flight and saves land in request order.
//!
//! After a successful save the cache entry and persisted baseline are
//! overwritten, dirty flags are cleared only when nothing changed while the
//! save was running, and a leader announces the save so followers can fold it
//! without persisting again.
//!
//! ```ignore
//! match coordinator.save_file("skill-1", SaveOptions::default()).await {
//!     Ok(SaveOutcome::Saved) => {}
//!     Ok(SaveOutcome::Skipped(reason)) => log::debug!("not saved: {:?}", reason),
//!     Err(e) => log::warn!("save failed: {}", e),
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};

use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;

use super::cache::{CacheKey, CachedFile, ContentCache};
use super::fallback::{FallbackRegistry, FallbackSnapshot};
use super::snapshot::{SaveSnapshot, SnapshotSources, normalize_metadata};
use crate::config::CollabConfig;
use crate::error::{CollabError, Result};
use crate::session::SessionManager;
use crate::store::DraftStore;

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Hands a detached task to the host's executor.
///
/// Saves triggered from synchronous callbacks (sync requests, editor unmount)
/// are spawned through this instead of being driven in place.
pub type Spawner = Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>;

/// Body of a persistence call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavePayload {
    /// Full file content.
    pub content: String,
    /// Normalized metadata, omitted when there is none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// One persistence call: `{appId, nodeId, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    /// Workspace (app) the file belongs to.
    pub app_id: String,
    /// The file id.
    pub node_id: String,
    /// What to persist.
    pub payload: SavePayload,
}

/// Durable storage for skill files.
///
/// Rejections carry a human-readable message; the coordinator wraps them in
/// [`CollabError::Persist`].
pub trait SkillPersistence: Send + Sync {
    /// Persist one file.
    fn save<'a>(&'a self, request: &'a SaveRequest) -> BoxFuture<'a, std::result::Result<(), String>>;
}

/// What triggered a save. Only explicit saves report failures loudly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveTrigger {
    /// The user pressed save.
    Explicit,
    /// Auto-save, visibility loss, unmount flush.
    #[default]
    Ambient,
    /// The leader was asked to persist by a follower.
    SyncRequest,
}

/// Caller-supplied fallbacks for a single save.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Content used when neither a draft nor a cache entry exists.
    pub fallback_content: Option<String>,
    /// Metadata paired with `fallback_content`.
    pub fallback_metadata: Option<Value>,
    /// What asked for the save.
    pub trigger: SaveTrigger,
}

impl SaveOptions {
    /// Options for a user-initiated save.
    pub fn explicit() -> Self {
        Self {
            trigger: SaveTrigger::Explicit,
            ..Self::default()
        }
    }
}

/// Why a save did not persist anything. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No workspace is bound.
    MissingAppId,
    /// The start tab is never persisted.
    StartTab,
    /// Another client leads this file; a sync request was sent instead.
    NotLeader,
    /// The file is live but the transport is down.
    Disconnected,
    /// Neither a draft, a cache entry, nor a fallback supplied content.
    NoContent,
}

/// Result of a save that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The persistence endpoint accepted the save.
    Saved,
    /// A guard stopped the save before anything was persisted.
    Skipped(SkipReason),
}

impl SaveOutcome {
    /// Whether anything was persisted.
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

/// Per-workspace save pipeline.
pub struct SaveCoordinator {
    config: CollabConfig,
    app_id: RwLock<Option<String>>,
    session: Arc<SessionManager>,
    drafts: Arc<dyn DraftStore>,
    cache: Arc<dyn ContentCache>,
    persistence: Arc<dyn SkillPersistence>,
    fallbacks: FallbackRegistry,
    queues: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SaveCoordinator {
    /// Create a coordinator. No workspace is bound until [`SaveCoordinator::set_app_id`].
    pub fn new(
        config: CollabConfig,
        session: Arc<SessionManager>,
        drafts: Arc<dyn DraftStore>,
        cache: Arc<dyn ContentCache>,
        persistence: Arc<dyn SkillPersistence>,
    ) -> Self {
        Self {
            config,
            app_id: RwLock::new(None),
            session,
            drafts,
            cache,
            persistence,
            fallbacks: FallbackRegistry::new(),
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Bind (or unbind) the workspace saves are issued for.
    pub fn set_app_id(&self, app_id: Option<String>) {
        *self.app_id.write().unwrap() = app_id;
    }

    /// The bound workspace.
    pub fn app_id(&self) -> Option<String> {
        self.app_id.read().unwrap().clone()
    }

    /// Supply a last-resort snapshot for a file.
    pub fn register_fallback(&self, file_id: &str, content: String, metadata: Option<Value>) {
        self.fallbacks
            .register(file_id, FallbackSnapshot { content, metadata });
    }

    /// Revoke a snapshot registered with [`SaveCoordinator::register_fallback`].
    pub fn unregister_fallback(&self, file_id: &str) {
        self.fallbacks.unregister(file_id);
    }

    /// The fallback registry, for inspection.
    pub fn fallbacks(&self) -> &FallbackRegistry {
        &self.fallbacks
    }

    /// Persist one file if this client is allowed to.
    ///
    /// Returns `Err(CollabError::Persist)` if the endpoint rejected the save;
    /// dirty flags are left set so the next trigger retries.
    pub async fn save_file(&self, file_id: &str, options: SaveOptions) -> Result<SaveOutcome> {
        let Some(app_id) = self.app_id() else {
            return Ok(SaveOutcome::Skipped(SkipReason::MissingAppId));
        };
        if !self.config.is_persistable(file_id) {
            return Ok(SaveOutcome::Skipped(SkipReason::StartTab));
        }
        if let Some(reason) = self.leadership_gate(file_id) {
            return Ok(SaveOutcome::Skipped(reason));
        }

        let queue = self.queue_for(file_id);
        let result = {
            let _turn = queue.lock().await;
            self.save_in_turn(&app_id, file_id, &options).await
        };
        self.release_queue(file_id, queue);

        if let Err(e) = &result {
            match options.trigger {
                SaveTrigger::Explicit => log::warn!("[SaveCoordinator] {}", e),
                SaveTrigger::Ambient | SaveTrigger::SyncRequest => {
                    log::debug!("[SaveCoordinator] {}", e)
                }
            }
        }
        result
    }

    /// Queue [`SaveCoordinator::save_file`] on `spawner` and return at once.
    ///
    /// For synchronous callers: a save already running for the same file
    /// holds its queue, so driving another one in place could never finish.
    pub fn spawn_save(self: &Arc<Self>, spawner: &Spawner, file_id: &str, options: SaveOptions) {
        let coordinator = Arc::clone(self);
        let file_id = file_id.to_string();
        spawner(Box::pin(async move {
            if let Err(e) = coordinator.save_file(&file_id, options).await {
                log::debug!("[SaveCoordinator] spawned save of {} failed: {}", file_id, e);
            }
        }));
    }

    /// Save every file with dirty content or metadata, concurrently.
    ///
    /// One file's failure never blocks another's save; each result is reported.
    pub async fn save_all_dirty(&self) -> Vec<(String, Result<SaveOutcome>)> {
        let mut dirty: IndexSet<String> = self.drafts.dirty_content_ids().into_iter().collect();
        dirty.extend(self.drafts.dirty_metadata_ids());
        dirty.retain(|file_id| *file_id != self.config.start_tab_id);

        log::debug!("[SaveCoordinator] flushing {} dirty file(s)", dirty.len());
        let saves = dirty.into_iter().map(|file_id| async move {
            let result = self.save_file(&file_id, SaveOptions::default()).await;
            (file_id, result)
        });
        futures_util::future::join_all(saves).await
    }

    /// Fold a `skill_file_saved` broadcast from the leader: update the cache and
    /// baseline, and clear dirty flags that match what was saved.
    pub fn apply_remote_save(&self, file_id: &str, content: &str, metadata: Option<Value>) {
        let Some(app_id) = self.app_id() else {
            return;
        };
        if !self.config.is_persistable(file_id) {
            return;
        }

        self.cache.write(
            &CacheKey::new(app_id, file_id),
            &CachedFile {
                content: content.to_string(),
                metadata: metadata.clone(),
            },
        );
        self.drafts.set_persisted_content(file_id, content.to_string());

        if self.drafts.draft_content(file_id).as_deref() == Some(content) {
            self.drafts.clear_draft_content(file_id);
        }
        if metadata.is_some() && self.current_metadata_matches(file_id, content, &metadata) {
            self.drafts.clear_metadata_dirty(file_id);
        }
        log::debug!("[SaveCoordinator] folded leader save of {}", file_id);
    }

    /// Drop queued-save bookkeeping and fallbacks.
    pub fn teardown(&self) {
        self.fallbacks.clear();
        self.queues.lock().unwrap().clear();
        self.set_app_id(None);
    }

    fn leadership_gate(&self, file_id: &str) -> Option<SkipReason> {
        if !self.config.enabled || !self.session.registry().is_open(file_id) {
            return None;
        }
        if !self.session.is_connected() {
            log::debug!("[SaveCoordinator] {} is live but offline, not saving", file_id);
            return Some(SkipReason::Disconnected);
        }
        if self.session.is_leader(file_id) {
            return None;
        }
        log::debug!("[SaveCoordinator] not leader for {}, requesting sync", file_id);
        self.session.request_sync(file_id);
        Some(SkipReason::NotLeader)
    }

    async fn save_in_turn(
        &self,
        app_id: &str,
        file_id: &str,
        options: &SaveOptions,
    ) -> Result<SaveOutcome> {
        let key = CacheKey::new(app_id, file_id);
        let sources = SnapshotSources {
            draft: self.drafts.draft_content(file_id),
            cached: self.cache.read(&key),
            committed_metadata: self.drafts.file_metadata(file_id),
            fallback_content: options.fallback_content.clone(),
            fallback_metadata: options.fallback_metadata.clone(),
            registered: self.fallbacks.get(file_id),
        };
        let Some(snapshot) = SaveSnapshot::resolve(sources) else {
            log::debug!("[SaveCoordinator] no content for {}, skipping", file_id);
            return Ok(SaveOutcome::Skipped(SkipReason::NoContent));
        };

        let request = SaveRequest {
            app_id: app_id.to_string(),
            node_id: file_id.to_string(),
            payload: SavePayload {
                content: snapshot.content.clone(),
                metadata: snapshot.metadata.clone(),
            },
        };
        log::debug!(
            "[SaveCoordinator] persisting {} from {:?}",
            file_id,
            snapshot.source
        );
        self.persistence
            .save(&request)
            .await
            .map_err(|message| CollabError::Persist {
                file_id: file_id.to_string(),
                message,
            })?;

        self.after_save(&key, &snapshot);
        Ok(SaveOutcome::Saved)
    }

    fn after_save(&self, key: &CacheKey, snapshot: &SaveSnapshot) {
        let file_id = key.node_id.as_str();
        self.cache.write(
            key,
            &CachedFile {
                content: snapshot.content.clone(),
                metadata: snapshot.metadata.clone(),
            },
        );
        self.drafts
            .set_persisted_content(file_id, snapshot.content.clone());

        // A newer edit that arrived mid-save stays dirty.
        if snapshot.draft.is_some() && self.drafts.draft_content(file_id) == snapshot.draft {
            self.drafts.clear_draft_content(file_id);
        }
        if self.drafts.is_metadata_dirty(file_id)
            && self.current_metadata_matches(file_id, &snapshot.content, &snapshot.metadata)
        {
            self.drafts.clear_metadata_dirty(file_id);
        }

        if self.config.enabled && self.session.is_leader(file_id) {
            self.session
                .broadcast_file_saved(file_id, &snapshot.content, snapshot.metadata.clone());
        }
        log::info!("[SaveCoordinator] saved {}", file_id);
    }

    fn current_metadata_matches(&self, file_id: &str, content: &str, saved: &Option<Value>) -> bool {
        normalize_metadata(self.drafts.file_metadata(file_id), content) == *saved
    }

    fn queue_for(&self, file_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut queues = self.queues.lock().unwrap();
        Arc::clone(queues.entry(file_id.to_string()).or_default())
    }

    fn release_queue(&self, file_id: &str, queue: Arc<tokio::sync::Mutex<()>>) {
        let mut queues = self.queues.lock().unwrap();
        // The map and `queue` hold the only references: nobody is waiting.
        if Arc::strong_count(&queue) == 2 {
            queues.remove(file_id);
        }
    }
}

impl std::fmt::Debug for SaveCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveCoordinator")
            .field("app_id", &self.app_id())
            .field("queued_files", &self.queues.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::DocumentRegistry;
    use crate::protocol::{CollaborationMessage, SkillStatusPayload, TransportEvent};
    use crate::save::MemoryContentCache;
    use crate::store::MemoryDraftStore;
    use crate::test_utils::{MockPersistence, MockTransportFactory, block_on};
    use serde_json::json;

    struct Fixture {
        coordinator: Arc<SaveCoordinator>,
        session: Arc<SessionManager>,
        factory: MockTransportFactory,
        drafts: Arc<MemoryDraftStore>,
        cache: Arc<MemoryContentCache>,
        persistence: Arc<MockPersistence>,
    }

    fn fixture(config: CollabConfig) -> Fixture {
        let factory = MockTransportFactory::new(true);
        let session = SessionManager::new(
            Arc::new(factory.clone()),
            Arc::new(DocumentRegistry::new()),
        );
        let drafts = Arc::new(MemoryDraftStore::new());
        let cache = Arc::new(MemoryContentCache::new());
        let persistence = MockPersistence::new();
        let coordinator = Arc::new(SaveCoordinator::new(
            config,
            Arc::clone(&session),
            drafts.clone(),
            cache.clone(),
            persistence.clone(),
        ));
        coordinator.set_app_id(Some("app-1".to_string()));
        Fixture {
            coordinator,
            session,
            factory,
            drafts,
            cache,
            persistence,
        }
    }

    fn make_leader(f: &Fixture, file_id: &str, is_leader: bool) {
        f.factory
            .transport("app-1")
            .deliver(TransportEvent::SkillStatus(SkillStatusPayload {
                file_id: file_id.to_string(),
                is_leader,
            }));
    }

    #[test]
    fn test_guards() {
        let f = fixture(CollabConfig::default());
        let outcome = block_on(f.coordinator.save_file("start", SaveOptions::default())).unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::StartTab));

        f.coordinator.set_app_id(None);
        let outcome = block_on(f.coordinator.save_file("a", SaveOptions::default())).unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::MissingAppId));

        assert!(f.persistence.calls().is_empty());
    }

    #[test]
    fn test_follower_requests_sync_instead_of_saving() {
        let f = fixture(CollabConfig::default());
        f.session.open_file("app-1", "a", "text");
        f.drafts.set_draft_content("a", "text!".to_string());
        let transport = f.factory.transport("app-1");
        transport.clear_sent();

        let outcome = block_on(f.coordinator.save_file("a", SaveOptions::default())).unwrap();

        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::NotLeader));
        assert!(f.persistence.calls().is_empty());
        assert_eq!(
            transport.sent_messages(),
            vec![CollaborationMessage::SkillSyncRequest {
                file_id: "a".to_string()
            }]
        );
        assert_eq!(f.drafts.draft_content("a").as_deref(), Some("text!"));
    }

    #[test]
    fn test_disconnected_live_file_is_not_saved() {
        let f = fixture(CollabConfig::default());
        f.session.open_file("app-1", "a", "text");
        make_leader(&f, "a", true);
        f.drafts.set_draft_content("a", "text!".to_string());
        f.factory.transport("app-1").set_connected(false);

        let outcome = block_on(f.coordinator.save_file("a", SaveOptions::default())).unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::Disconnected));
        assert!(f.persistence.calls().is_empty());
    }

    #[test]
    fn test_leader_saves_and_broadcasts() {
        let f = fixture(CollabConfig::default());
        f.session.open_file("app-1", "a", "text");
        make_leader(&f, "a", true);
        f.drafts.set_draft_content("a", "text!".to_string());
        let transport = f.factory.transport("app-1");
        transport.clear_sent();

        let outcome = block_on(f.coordinator.save_file("a", SaveOptions::default())).unwrap();

        assert!(outcome.is_saved());
        assert_eq!(f.drafts.draft_content("a"), None);
        assert_eq!(f.drafts.persisted_content("a").as_deref(), Some("text!"));
        assert_eq!(
            f.cache.read(&CacheKey::new("app-1", "a")).unwrap().content,
            "text!"
        );
        assert!(matches!(
            transport.sent_messages().as_slice(),
            [CollaborationMessage::SkillFileSaved { content, .. }] if content == "text!"
        ));
    }

    #[test]
    fn test_disabled_collaboration_saves_without_leadership() {
        let f = fixture(CollabConfig::disabled());
        f.drafts.set_draft_content("a", "solo".to_string());

        let outcome = block_on(f.coordinator.save_file("a", SaveOptions::default())).unwrap();
        assert!(outcome.is_saved());
        assert_eq!(f.persistence.calls()[0].payload.content, "solo");
    }

    #[test]
    fn test_failure_keeps_dirty_flags() {
        let f = fixture(CollabConfig::disabled());
        f.drafts.set_draft_content("a", "unsaved".to_string());
        f.drafts.set_draft_metadata("a", json!({ "tools": {} }));
        f.persistence.set_failing(true);

        let result = block_on(f.coordinator.save_file("a", SaveOptions::explicit()));

        assert!(matches!(result, Err(CollabError::Persist { ref file_id, .. }) if file_id == "a"));
        assert_eq!(f.drafts.draft_content("a").as_deref(), Some("unsaved"));
        assert!(f.drafts.is_metadata_dirty("a"));
        assert_eq!(f.cache.read(&CacheKey::new("app-1", "a")), None);
    }

    #[test]
    fn test_no_content_is_skipped() {
        let f = fixture(CollabConfig::disabled());
        let outcome = block_on(f.coordinator.save_file("a", SaveOptions::default())).unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::NoContent));
    }

    #[test]
    fn test_fallback_registry_used_last() {
        let f = fixture(CollabConfig::disabled());
        f.coordinator
            .register_fallback("a", "from unmount".to_string(), Some(json!({ "k": 1 })));

        block_on(f.coordinator.save_file("a", SaveOptions::default())).unwrap();
        let call = &f.persistence.calls()[0];
        assert_eq!(call.payload.content, "from unmount");
        assert_eq!(call.payload.metadata, Some(json!({ "k": 1 })));

        f.coordinator.unregister_fallback("a");
        f.cache
            .write_raw(&CacheKey::new("app-1", "b"), "cached raw".to_string());
        f.coordinator
            .register_fallback("b", "stale".to_string(), None);
        block_on(f.coordinator.save_file("b", SaveOptions::default())).unwrap();
        assert_eq!(f.persistence.calls()[1].payload.content, "cached raw");
    }

    #[test]
    fn test_saves_are_serialized() {
        let f = fixture(CollabConfig::disabled());
        f.drafts.set_draft_content("a", "v1".to_string());
        let drafts = Arc::clone(&f.drafts);
        f.persistence.set_hook(move |request| {
            if request.payload.content == "v1" {
                drafts.set_draft_content("a", "v2".to_string());
            }
        });

        let (first, second) = block_on(futures_lite::future::zip(
            f.coordinator.save_file("a", SaveOptions::default()),
            f.coordinator.save_file("a", SaveOptions::default()),
        ));

        assert!(first.unwrap().is_saved());
        assert!(second.unwrap().is_saved());
        let calls = f.persistence.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].payload.content, "v1");
        assert_eq!(calls[1].payload.content, "v2");
        assert_eq!(f.persistence.max_in_flight(), 1);
        assert_eq!(f.drafts.draft_content("a"), None);
    }

    #[test]
    fn test_edit_during_save_stays_dirty() {
        let f = fixture(CollabConfig::disabled());
        f.drafts.set_draft_content("a", "D1".to_string());
        let drafts = Arc::clone(&f.drafts);
        f.persistence
            .set_hook(move |_| drafts.set_draft_content("a", "D2".to_string()));

        block_on(f.coordinator.save_file("a", SaveOptions::default())).unwrap();

        assert_eq!(f.drafts.draft_content("a").as_deref(), Some("D2"));
        assert_eq!(f.drafts.persisted_content("a").as_deref(), Some("D1"));
    }

    #[test]
    fn test_metadata_pruned_and_dirty_cleared() {
        let f = fixture(CollabConfig::disabled());
        f.drafts
            .set_draft_content("a", "use §[tool].[p].[search].[id1]§".to_string());
        f.drafts.set_draft_metadata(
            "a",
            json!({ "tools": { "id1": { "on": true }, "id2": { "on": true } } }),
        );

        block_on(f.coordinator.save_file("a", SaveOptions::default())).unwrap();

        assert_eq!(
            f.persistence.calls()[0].payload.metadata,
            Some(json!({ "tools": { "id1": { "on": true } } }))
        );
        assert!(!f.drafts.is_metadata_dirty("a"));
    }

    #[test]
    fn test_save_all_dirty_reports_each_file() {
        let f = fixture(CollabConfig::disabled());
        f.drafts.set_draft_content("a", "A".to_string());
        f.drafts.set_draft_content("start", "welcome".to_string());
        f.drafts.set_draft_metadata("b", json!({}));
        f.cache
            .write_raw(&CacheKey::new("app-1", "b"), "B".to_string());

        let results = block_on(f.coordinator.save_all_dirty());

        let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(results.iter().all(|(_, r)| matches!(r, Ok(SaveOutcome::Saved))));
        assert!(f.drafts.dirty_metadata_ids().is_empty());
    }

    #[test]
    fn test_follower_folds_remote_save() {
        let f = fixture(CollabConfig::default());
        f.drafts.set_draft_content("a", "same".to_string());
        f.drafts.set_draft_metadata("a", json!({ "tools": {} }));

        f.coordinator
            .apply_remote_save("a", "same", Some(json!({ "tools": {} })));

        assert_eq!(f.drafts.draft_content("a"), None);
        assert!(!f.drafts.is_metadata_dirty("a"));
        assert_eq!(
            f.cache.read(&CacheKey::new("app-1", "a")).unwrap().content,
            "same"
        );
        assert!(f.persistence.calls().is_empty());

        f.drafts.set_draft_content("a", "mine".to_string());
        f.coordinator.apply_remote_save("a", "theirs", None);
        assert_eq!(f.drafts.draft_content("a").as_deref(), Some("mine"));
    }
}
