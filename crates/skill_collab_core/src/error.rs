use serde::Serialize;
use thiserror::Error;

/// Unified error type for collaboration operations
#[derive(Debug, Error)]
pub enum CollabError {
    /// Filesystem failure (config files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A delta or snapshot could not be decoded or applied.
    #[error("CRDT error: {0}")]
    Crdt(String),

    /// The file has no document in the registry.
    #[error("Document '{0}' is not open")]
    DocumentNotOpen(String),

    /// An envelope of a known type carried unreadable data.
    #[error("Malformed collaboration message: {0}")]
    Protocol(String),

    /// An envelope type this crate does not handle.
    #[error("Unknown collaboration message type '{0}'")]
    UnknownMessage(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The persistence endpoint rejected a save.
    #[error("Failed to persist file '{file_id}': {message}")]
    Persist {
        /// File that was being saved.
        file_id: String,
        /// Message from the endpoint.
        message: String,
    },

    /// Config TOML could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config could not be written as TOML.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Result type alias for collaboration operations
pub type Result<T> = std::result::Result<T, CollabError>;

/// A serializable representation of CollabError for IPC hosts
#[derive(Debug, Clone, Serialize)]
pub struct SerializableError {
    /// Error kind/variant name
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Associated file id (if applicable)
    pub file_id: Option<String>,
}

impl From<&CollabError> for SerializableError {
    fn from(err: &CollabError) -> Self {
        let kind = match err {
            CollabError::Io(_) => "Io",
            CollabError::Crdt(_) => "Crdt",
            CollabError::DocumentNotOpen(_) => "DocumentNotOpen",
            CollabError::Protocol(_) => "Protocol",
            CollabError::UnknownMessage(_) => "UnknownMessage",
            CollabError::Json(_) => "Json",
            CollabError::Persist { .. } => "Persist",
            CollabError::ConfigParse(_) => "ConfigParse",
            CollabError::ConfigSerialize(_) => "ConfigSerialize",
        }
        .to_string();

        let file_id = match err {
            CollabError::DocumentNotOpen(id) => Some(id.clone()),
            CollabError::Persist { file_id, .. } => Some(file_id.clone()),
            _ => None,
        };

        Self {
            kind,
            message: err.to_string(),
            file_id,
        }
    }
}

impl From<CollabError> for SerializableError {
    fn from(err: CollabError) -> Self {
        SerializableError::from(&err)
    }
}

impl CollabError {
    /// Convert to a serializable representation for IPC
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializable_persist_error_carries_file_id() {
        let err = CollabError::Persist {
            file_id: "skill-1".to_string(),
            message: "503".to_string(),
        };
        let ser = err.to_serializable();
        assert_eq!(ser.kind, "Persist");
        assert_eq!(ser.file_id.as_deref(), Some("skill-1"));
        assert!(ser.message.contains("503"));
    }

    #[test]
    fn test_serializable_without_file_id() {
        let ser = SerializableError::from(CollabError::UnknownMessage("graph_update".to_string()));
        assert_eq!(ser.kind, "UnknownMessage");
        assert_eq!(ser.file_id, None);
    }
}
