//! Save snapshot resolution.
//!
//! Content comes from the first available of: the dirty draft, the cache
//! entry, the caller's fallback argument, the fallback registry. Metadata
//! comes from: committed metadata, the caller's fallback argument, the
//! fallback registry. Metadata is then normalized against the resolved
//! content so stale tool bindings are not persisted.

use serde_json::Value;

use super::cache::CachedFile;
use super::fallback::FallbackSnapshot;
use crate::references;

/// Where the content of a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// The dirty draft.
    Draft,
    /// The content cache entry.
    Cache,
    /// `SaveOptions::fallback_content`.
    FallbackArgument,
    /// The editor-registered fallback.
    FallbackRegistry,
}

/// Everything known about a file at save time.
#[derive(Debug, Default)]
pub struct SnapshotSources {
    /// Dirty draft text, if any.
    pub draft: Option<String>,
    /// Cache entry for the file.
    pub cached: Option<CachedFile>,
    /// Metadata committed in the draft store.
    pub committed_metadata: Option<Value>,
    /// Content passed by the caller.
    pub fallback_content: Option<String>,
    /// Metadata passed by the caller.
    pub fallback_metadata: Option<Value>,
    /// Fallback registered by a mounted editor.
    pub registered: Option<FallbackSnapshot>,
}

/// Content and normalized metadata to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveSnapshot {
    /// Text to persist.
    pub content: String,
    /// Metadata normalized against `content`.
    pub metadata: Option<Value>,
    /// Which source supplied `content`.
    pub source: ContentSource,
    /// The draft this snapshot was built from, compared after the save
    /// to decide whether content is still dirty.
    pub draft: Option<String>,
}

impl SaveSnapshot {
    /// Resolve a snapshot, or `None` if no content is available.
    pub fn resolve(sources: SnapshotSources) -> Option<Self> {
        let SnapshotSources {
            draft,
            cached,
            committed_metadata,
            fallback_content,
            fallback_metadata,
            registered,
        } = sources;

        let (content, source) = if let Some(draft) = draft.clone() {
            (draft, ContentSource::Draft)
        } else if let Some(cached) = cached {
            (cached.content, ContentSource::Cache)
        } else if let Some(content) = fallback_content {
            (content, ContentSource::FallbackArgument)
        } else if let Some(registered) = registered.as_ref() {
            (registered.content.clone(), ContentSource::FallbackRegistry)
        } else {
            return None;
        };

        let metadata = committed_metadata
            .or(fallback_metadata)
            .or_else(|| registered.and_then(|r| r.metadata));

        Some(SaveSnapshot {
            metadata: normalize_metadata(metadata, &content),
            content,
            source,
            draft,
        })
    }
}

/// Drop `tools` entries that `content` no longer references.
pub fn normalize_metadata(metadata: Option<Value>, content: &str) -> Option<Value> {
    metadata.map(|mut metadata| {
        references::prune_tools(&mut metadata, content);
        metadata
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registered() -> Option<FallbackSnapshot> {
        Some(FallbackSnapshot {
            content: "registered".to_string(),
            metadata: Some(json!({ "from": "registry" })),
        })
    }

    #[test]
    fn test_draft_wins() {
        let snapshot = SaveSnapshot::resolve(SnapshotSources {
            draft: Some("draft".to_string()),
            cached: Some(CachedFile {
                content: "cached".to_string(),
                metadata: None,
            }),
            registered: registered(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(snapshot.content, "draft");
        assert_eq!(snapshot.source, ContentSource::Draft);
        assert_eq!(snapshot.draft.as_deref(), Some("draft"));
        assert_eq!(snapshot.metadata, Some(json!({ "from": "registry" })));
    }

    #[test]
    fn test_registry_only_when_nothing_else() {
        let snapshot = SaveSnapshot::resolve(SnapshotSources {
            fallback_content: Some("argument".to_string()),
            registered: registered(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(snapshot.source, ContentSource::FallbackArgument);

        let snapshot = SaveSnapshot::resolve(SnapshotSources {
            registered: registered(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(snapshot.source, ContentSource::FallbackRegistry);
        assert_eq!(snapshot.content, "registered");
        assert_eq!(snapshot.draft, None);
    }

    #[test]
    fn test_no_content_no_snapshot() {
        let snapshot = SaveSnapshot::resolve(SnapshotSources {
            committed_metadata: Some(json!({})),
            ..Default::default()
        });
        assert!(snapshot.is_none());
    }

    #[test]
    fn test_committed_metadata_is_normalized() {
        let snapshot = SaveSnapshot::resolve(SnapshotSources {
            draft: Some("§[tool].[p].[search].[id1]§".to_string()),
            committed_metadata: Some(json!({ "tools": { "id1": { "a": 1 }, "id2": { "b": 2 } } })),
            fallback_metadata: Some(json!({ "ignored": true })),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(snapshot.metadata, Some(json!({ "tools": { "id1": { "a": 1 } } })));
    }
}
