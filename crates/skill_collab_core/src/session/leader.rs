//! Per-file leader flags, written only from server `skill_status` pushes.

use std::collections::HashMap;
use std::sync::RwLock;

/// Mapping `file_id -> is_leader`.
#[derive(Debug, Default)]
pub struct LeaderTable {
    flags: RwLock<HashMap<String, bool>>,
}

impl LeaderTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status push. Returns `true` if the flag changed.
    ///
    /// A file with no entry counts as "not leader", so a first push of
    /// `false` is not a change.
    pub fn set(&self, file_id: &str, is_leader: bool) -> bool {
        let mut flags = self.flags.write().unwrap();
        let previous = flags.insert(file_id.to_string(), is_leader).unwrap_or(false);
        previous != is_leader
    }

    /// Whether this client leads `file_id`.
    pub fn is_leader(&self, file_id: &str) -> bool {
        self.flags
            .read()
            .unwrap()
            .get(file_id)
            .copied()
            .unwrap_or(false)
    }

    /// Files this client currently leads.
    pub fn led_files(&self) -> Vec<String> {
        self.flags
            .read()
            .unwrap()
            .iter()
            .filter(|(_, leader)| **leader)
            .map(|(file_id, _)| file_id.clone())
            .collect()
    }

    /// Forget every flag.
    pub fn clear(&self) {
        self.flags.write().unwrap().clear();
    }
}
