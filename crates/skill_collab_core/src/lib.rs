#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Configuration options
pub mod config;

/// Per-workspace context wiring every component together
pub mod context;

/// Replicated skill documents (yrs-backed)
pub mod crdt;

/// Cursor presence (throttled broadcast, TTL-bounded rendering)
pub mod cursor;

/// Editing-session adapter between an editor and its document
pub mod editing;

/// Editor widget capability
pub mod editor;

/// Error (common error types)
pub mod error;

/// Ordered listener registry
pub mod listeners;

/// Wire protocol (events and envelopes)
pub mod protocol;

/// Inline tool and file references
pub mod references;

/// Save coordination
pub mod save;

/// Transport session and leader tracking
pub mod session;

/// Draft and dirty state
pub mod store;

/// Transport capability
pub mod transport;

pub use config::CollabConfig;
pub use context::{CollabContext, CollabDeps};
pub use error::{CollabError, Result, SerializableError};

/// In-memory capabilities shared by the unit tests.
#[cfg(test)]
pub mod test_utils;
