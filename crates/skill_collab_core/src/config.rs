//! Configuration for the collaboration core.
//!
//! [`CollabConfig`] holds the tunables shared by every component of a
//! workspace session. It is persisted as TOML and every field has a default,
//! so partial files are accepted.
//!
//! # Example
//!
//! ```ignore
//! use skill_collab_core::config::CollabConfig;
//!
//! let config = CollabConfig::from_toml_str("cursor_ttl_ms = 30000")?;
//! assert_eq!(config.cursor_throttle_ms, 200);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default cursor broadcast throttle window.
pub const DEFAULT_CURSOR_THROTTLE_MS: u64 = 200;

/// Default time-to-live for remote cursor entries.
pub const DEFAULT_CURSOR_TTL_MS: u64 = 15_000;

/// Id of the start tab, which is never backed by a persistable file.
pub const DEFAULT_START_TAB_ID: &str = "start";

/// Prefix of the per-user CSS classes used for remote selections.
pub const DEFAULT_CURSOR_CLASS_PREFIX: &str = "skill-remote-selection";

/// Settings shared by the components of one workspace session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollabConfig {
    /// Whether real-time collaboration is enabled at all.
    /// When disabled, editing sessions pass edits straight through and saves
    /// never consult leadership.
    pub enabled: bool,

    /// Window (ms) within which local selection changes collapse into one broadcast.
    pub cursor_throttle_ms: u64,

    /// Age (ms) after which a remote cursor is no longer rendered.
    pub cursor_ttl_ms: u64,

    /// Tab id that is never saved (the editor's start/welcome tab).
    pub start_tab_id: String,

    /// Prefix for the stable per-user selection CSS class.
    pub cursor_class_prefix: String,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cursor_throttle_ms: DEFAULT_CURSOR_THROTTLE_MS,
            cursor_ttl_ms: DEFAULT_CURSOR_TTL_MS,
            start_tab_id: DEFAULT_START_TAB_ID.to_string(),
            cursor_class_prefix: DEFAULT_CURSOR_CLASS_PREFIX.to_string(),
        }
    }
}

impl CollabConfig {
    /// Config with collaboration switched off (single-user editing).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Render the config as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load config from a path, returning the default if it is missing or invalid.
    pub fn load_from_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default collab config ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to a specific path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = self.to_toml_string()?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Whether a tab id refers to something that can be persisted.
    pub fn is_persistable(&self, file_id: &str) -> bool {
        !file_id.is_empty() && file_id != self.start_tab_id
    }
}
