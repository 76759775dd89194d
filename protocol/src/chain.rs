use crate::marker::RevisionId;
use serde::Deserialize;
use serde::Serialize;

/// One contiguous block of modified lines within a diff.
///
/// Coordinates are 0-based line indices. `old_start`/`old_lines` cover the
/// removed block in the pre-image, `new_start`/`new_lines` the inserted
/// block in the post-image; a pure insertion has `old_lines == 0` and
/// `old_start` pointing at the line the insertion lands before. `removed`
/// and `added` carry the affected line text (without trailing newlines) so
/// the translator can re-anchor a span by content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub removed: Vec<String>,
    pub added: Vec<String>,
}

impl DiffHunk {
    /// Exclusive end of the removed block in pre-image coordinates.
    pub fn old_end(&self) -> u32 {
        self.old_start + self.old_lines
    }

    /// Exclusive end of the inserted block in post-image coordinates.
    pub fn new_end(&self) -> u32 {
        self.new_start + self.new_lines
    }

    pub fn line_delta(&self) -> i64 {
        i64::from(self.new_lines) - i64::from(self.old_lines)
    }

    /// Whether the hunk removes the given pre-image line.
    pub fn removes(&self, line: u32) -> bool {
        self.old_lines > 0 && line >= self.old_start && line < self.old_end()
    }
}

/// The diff between two adjacent states of one file. Hunks are ordered by
/// `old_start` and do not overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }
}

/// One committed step of a revision chain: the diff from the previous
/// chain point to `revision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    pub revision: RevisionId,
    pub diff: FileDiff,
}

/// Ordered diffs connecting a marker's origin revision to the current
/// buffer state: committed steps in strict origin→current order, then an
/// optional trailing diff for uncommitted edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionChain {
    pub origin: RevisionId,
    pub steps: Vec<ChainStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty: Option<FileDiff>,
}

impl RevisionChain {
    /// Chain with no intervening edits (origin is the current state).
    pub fn empty(origin: RevisionId) -> Self {
        Self {
            origin,
            steps: Vec::new(),
            dirty: None,
        }
    }

    /// All diffs in application order, the dirty diff last.
    pub fn diffs(&self) -> impl Iterator<Item = &FileDiff> {
        self.steps.iter().map(|step| &step.diff).chain(self.dirty.iter())
    }

    /// Number of diffs in the chain, counting the dirty diff.
    pub fn len(&self) -> usize {
        self.steps.len() + usize::from(self.dirty.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.dirty.is_none()
    }
}
