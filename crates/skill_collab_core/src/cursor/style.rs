//! Stable per-user selection styles.
//!
//! Class names and colors are derived from a hash of the user id, so every
//! render of the same user maps to the same CSS rule. [`StyleRegistry`]
//! remembers which rules were handed out so each is injected once.

use std::collections::HashSet;
use std::sync::RwLock;

const PALETTE: [&str; 10] = [
    "#2E90FA", "#12B76A", "#F79009", "#EE46BC", "#7A5AF8", "#06AED4", "#F04438", "#66C61C",
    "#EF6820", "#6172F3",
];

/// 32-bit FNV-1a hash of a user id.
pub fn user_hash(user_id: &str) -> u32 {
    user_id.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    })
}

/// Caret and selection color of a user.
pub fn user_color(user_id: &str) -> &'static str {
    PALETTE[user_hash(user_id) as usize % PALETTE.len()]
}

/// CSS class of a user's selection decoration.
pub fn user_class(prefix: &str, user_id: &str) -> String {
    format!("{}-{:08x}", prefix, user_hash(user_id))
}

/// A CSS rule the host should inject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Class the rule targets.
    pub class_name: String,
    /// Full rule text.
    pub css: String,
}

/// Tracks which per-user rules were already handed out.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    injected: RwLock<HashSet<String>>,
}

impl StyleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Class for `user_id`, plus its rule the first time it is requested.
    pub fn ensure(&self, prefix: &str, user_id: &str) -> (String, Option<StyleRule>) {
        let class_name = user_class(prefix, user_id);
        if self.injected.read().unwrap().contains(&class_name) {
            return (class_name, None);
        }
        if !self.injected.write().unwrap().insert(class_name.clone()) {
            return (class_name, None);
        }

        // 0x33 alpha keeps the selection translucent.
        let css = format!(
            ".{} {{ background-color: {}33; }}",
            class_name,
            user_color(user_id)
        );
        let rule = StyleRule {
            class_name: class_name.clone(),
            css,
        };
        (class_name, Some(rule))
    }

    /// Forget handed-out rules, e.g. after the host dropped its stylesheet.
    pub fn clear(&self) {
        self.injected.write().unwrap().clear();
    }
}
