//! Inline tool and file references in skill content.
//!
//! Skill text embeds references as tokens:
//!
//! - tool: `§[tool].[<provider>].[<tool name>].[<id>]§`
//! - file: `§[file].[<source>].[<id>]§`
//!
//! Metadata keeps one entry per referenced id under `tools` and `files`.
//! The prune functions drop entries whose token no longer appears in the
//! content, so deleting a reference from the text also drops its binding.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static TOOL_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"§\[tool\]\.\[([^\]]+)\]\.\[([^\]]+)\]\.\[([^\]]+)\]§")
        .expect("tool reference pattern is valid")
});

static FILE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"§\[file\]\.\[([^\]]+)\]\.\[([^\]]+)\]§").expect("file reference pattern is valid")
});

/// A parsed tool reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReference {
    /// Provider segment.
    pub provider: String,
    /// Tool name within the provider.
    pub tool_name: String,
    /// Binding id carried in the reference.
    pub id: String,
}

/// A parsed file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    /// Source segment of the reference.
    pub source: String,
    /// File id.
    pub id: String,
}

/// All tool references in `content`, in order of appearance.
pub fn tool_references(content: &str) -> Vec<ToolReference> {
    TOOL_REFERENCE
        .captures_iter(content)
        .map(|caps| ToolReference {
            provider: caps[1].to_string(),
            tool_name: caps[2].to_string(),
            id: caps[3].to_string(),
        })
        .collect()
}

/// All file references in `content`, in order of appearance.
pub fn file_references(content: &str) -> Vec<FileReference> {
    FILE_REFERENCE
        .captures_iter(content)
        .map(|caps| FileReference {
            source: caps[1].to_string(),
            id: caps[2].to_string(),
        })
        .collect()
}

/// Drop `tools` entries not referenced by `content`. Returns `true` if anything was removed.
pub fn prune_tools(metadata: &mut Value, content: &str) -> bool {
    let referenced: HashSet<String> = tool_references(content).into_iter().map(|r| r.id).collect();
    retain_keys(metadata, "tools", &referenced)
}

/// Drop `files` entries not referenced by `content`. Returns `true` if anything was removed.
pub fn prune_files(metadata: &mut Value, content: &str) -> bool {
    let referenced: HashSet<String> = file_references(content).into_iter().map(|r| r.id).collect();
    retain_keys(metadata, "files", &referenced)
}

fn retain_keys(metadata: &mut Value, field: &str, keep: &HashSet<String>) -> bool {
    let Some(map) = metadata.get_mut(field).and_then(Value::as_object_mut) else {
        return false;
    };
    let before = map.len();
    map.retain(|key, _| keep.contains(key));
    map.len() != before
}
