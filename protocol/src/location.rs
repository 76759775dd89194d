use serde::Deserialize;
use serde::Serialize;

/// A span of text in one specific document state.
///
/// Lines and columns are 0-based; columns are end-exclusive. A `Location`
/// is only meaningful paired with the buffer state (a committed revision or
/// the live dirty buffer) it was computed against — the engine never mixes
/// coordinate spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line_start: u32,
    pub col_start: u32,
    pub line_end: u32,
    pub col_end: u32,
}

impl Location {
    pub fn new(line_start: u32, col_start: u32, line_end: u32, col_end: u32) -> Self {
        Self {
            line_start,
            col_start,
            line_end,
            col_end,
        }
    }

    /// Number of lines the span touches.
    pub fn line_count(&self) -> u32 {
        self.line_end.saturating_sub(self.line_start) + 1
    }
}
