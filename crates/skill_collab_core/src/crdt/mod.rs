//! Replicated skill documents.
//!
//! Each open skill file is backed by a [`SkillDoc`] (a Y.Doc with a single
//! text root). The [`DocumentRegistry`] owns them for the current workspace.
//! Merging is delegated to yrs: imports commute, duplicate imports are
//! no-ops, and a snapshot carries everything needed to rebuild the text.

mod registry;
mod skill_doc;
mod types;

pub use registry::DocumentRegistry;
pub use skill_doc::SkillDoc;
pub use types::{LocalUpdateSink, TextChange, UpdateOrigin};
