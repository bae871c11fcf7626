//! Save coordination: snapshot resolution, per-file serialized persistence,
//! the content cache capability, and the fallback registry.

mod cache;
mod coordinator;
mod fallback;
mod snapshot;

pub use cache::{CacheKey, CachedFile, ContentCache, MemoryContentCache};
pub use coordinator::{
    BoxFuture, SaveCoordinator, SaveOptions, SaveOutcome, SavePayload, SaveRequest, SaveTrigger,
    SkillPersistence, SkipReason, Spawner,
};
pub use fallback::{FallbackRegistry, FallbackSnapshot};
pub use snapshot::{ContentSource, SaveSnapshot, SnapshotSources, normalize_metadata};
