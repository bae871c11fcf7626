//! Editor widget capability.
//!
//! The text editor itself lives in the host. The cursor channel only needs to
//! turn a line/column selection into absolute offsets and to map an offset
//! back to a pixel position in the current viewport.

use serde::{Deserialize, Serialize};

/// Zero-based line/column position. Columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextPosition {
    /// Zero-based line.
    pub line: usize,
    /// Zero-based character column.
    pub column: usize,
}

impl TextPosition {
    /// Position at `line`, `column`.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Pixel position of a caret relative to the editor viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportPoint {
    /// Horizontal offset.
    pub x: f64,
    /// Top of the line box.
    pub y: f64,
    /// Line height at that position.
    pub height: f64,
}

/// What the host editor widget exposes to the cursor channel.
pub trait EditorWidget {
    /// Absolute character offset of a position.
    fn offset_at(&self, position: TextPosition) -> usize;

    /// Viewport position of an offset, or `None` if it is scrolled out of view.
    fn point_at(&self, offset: usize) -> Option<ViewportPoint>;
}

/// Absolute character offset of `position` in `text`.
///
/// Positions past the end of a line clamp to the line end, and lines past the
/// end of the text clamp to the text end.
pub fn offset_in(text: &str, position: TextPosition) -> usize {
    let mut offset = 0;
    for (index, line) in text.split('\n').enumerate() {
        let length = line.chars().count();
        if index == position.line {
            return offset + position.column.min(length);
        }
        offset += length + 1;
    }
    text.chars().count()
}
