//! The diff-based translator: a pure function that carries a marker's
//! origin span through an ordered chain of diffs and expresses it in the
//! coordinate space of the live buffer, or fails with a typed reason.

use pinpoint_protocol::DiffHunk;
use pinpoint_protocol::FileDiff;
use pinpoint_protocol::Location;
use pinpoint_protocol::RevisionChain;

/// Outcome of translating one anchor through one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Located {
        location: Location,
        /// More than half of the chain's diffs required re-anchoring.
        /// Callers may choose to still display the marker.
        low_confidence: bool,
    },
    Failed(TranslationFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationFailure {
    /// Every line of the span was removed and its content did not survive
    /// anywhere in the replacing text.
    Deleted { detail: String },
    /// The translated position falls outside the live buffer.
    OutOfBounds { line: u32, buffer_lines: u32 },
    /// The span's content reappears in several equally plausible places
    /// and no single choice can be preferred.
    Ambiguous { matches: usize },
}

enum LineFate {
    Kept(u32),
    Removed,
}

/// Translate `origin` through `chain`, expressing the result against
/// `buffer` (the live, possibly dirty contents the chain ends at).
///
/// Pure function of its inputs; no I/O, no shared state.
pub fn translate(origin: &Location, chain: &RevisionChain, buffer: &str) -> Translation {
    let mut candidate = *origin;
    let mut reanchored_steps = 0usize;

    for diff in chain.diffs() {
        match translate_step(diff, &candidate) {
            Ok((next, reanchored)) => {
                if reanchored {
                    reanchored_steps += 1;
                }
                candidate = next;
            }
            Err(failure) => return Translation::Failed(failure),
        }
    }

    let lines: Vec<&str> = buffer.lines().collect();
    let buffer_lines = lines.len() as u32;
    if candidate.line_start >= buffer_lines || candidate.line_end >= buffer_lines {
        return Translation::Failed(TranslationFailure::OutOfBounds {
            line: candidate.line_end.max(candidate.line_start),
            buffer_lines,
        });
    }

    candidate.col_start = candidate.col_start.min(line_width(&lines, candidate.line_start));
    candidate.col_end = candidate.col_end.min(line_width(&lines, candidate.line_end));
    if candidate.line_start == candidate.line_end && candidate.col_end < candidate.col_start {
        candidate.col_end = candidate.col_start;
    }

    Translation::Located {
        location: candidate,
        low_confidence: reanchored_steps * 2 > chain.len(),
    }
}

/// Carry the span across one diff. Returns the moved span and whether the
/// step needed re-anchoring (any hunk edited inside the span).
fn translate_step(
    diff: &FileDiff,
    span: &Location,
) -> Result<(Location, bool), TranslationFailure> {
    if diff.is_empty() {
        return Ok((*span, false));
    }

    let fully_removed = (span.line_start..=span.line_end)
        .all(|line| matches!(map_line(diff, line), LineFate::Removed));
    if fully_removed {
        return relocate_removed_span(diff, span);
    }

    let touched = diff
        .hunks
        .iter()
        .any(|hunk| touches(hunk, span.line_start, span.line_end));

    let (line_start, col_start) = match map_line(diff, span.line_start) {
        LineFate::Kept(line) => (line, span.col_start),
        LineFate::Removed => start_from_replacement(diff, span),
    };
    let (line_end, col_end) = match map_line(diff, span.line_end) {
        LineFate::Kept(line) => (line, span.col_end),
        LineFate::Removed => end_from_replacement(diff, span),
    };

    if line_end < line_start {
        return Err(TranslationFailure::Deleted {
            detail: "span collapsed to nothing after re-anchoring".to_string(),
        });
    }

    Ok((Location::new(line_start, col_start, line_end, col_end), touched))
}

/// Where a line of the pre-image lands in the post-image. Hunks are sorted
/// by `old_start`, so the cumulative delta of the hunks before the line is
/// its shift; a line inside a removed block has no post-image position.
fn map_line(diff: &FileDiff, line: u32) -> LineFate {
    let mut shift: i64 = 0;
    for hunk in &diff.hunks {
        if hunk.removes(line) {
            return LineFate::Removed;
        }
        if hunk.old_end() <= line {
            shift += hunk.line_delta();
        } else {
            break;
        }
    }
    let mapped = i64::from(line) + shift;
    LineFate::Kept(mapped.max(0) as u32)
}

/// Whether the hunk edits inside the span: a removal overlapping it, or an
/// insertion strictly between its boundaries.
fn touches(hunk: &DiffHunk, start: u32, end: u32) -> bool {
    if hunk.old_lines == 0 {
        hunk.old_start > start && hunk.old_start <= end
    } else {
        hunk.old_start <= end && hunk.old_end() > start
    }
}

fn covering_hunk<'a>(diff: &'a FileDiff, line: u32) -> Option<&'a DiffHunk> {
    diff.hunks.iter().find(|hunk| hunk.removes(line))
}

/// Re-anchor a removed start boundary: the span now begins where the
/// covering hunk's replacement block begins (the mapped position of the
/// nearest surviving line before the span, plus one). The original start
/// line is gone, so its column collapses to 0.
fn start_from_replacement(diff: &FileDiff, span: &Location) -> (u32, u32) {
    match covering_hunk(diff, span.line_start) {
        Some(hunk) => (hunk.new_start, 0),
        None => (span.line_start, span.col_start),
    }
}

/// Re-anchor a removed end boundary: the span now ends where the covering
/// hunk's replacement block ends. The original end line is gone, so the
/// column is clamped to line bounds during final normalization.
fn end_from_replacement(diff: &FileDiff, span: &Location) -> (u32, u32) {
    match covering_hunk(diff, span.line_end) {
        Some(hunk) => (hunk.new_end().saturating_sub(1), u32::MAX),
        None => (span.line_end, span.col_end),
    }
}

/// Every line of the span was removed at this step. The span's original
/// text is recovered from the covering hunks and searched for in the
/// replacing text: exactly one occurrence relocates the span, several are
/// ambiguous, none means the code is gone.
fn relocate_removed_span(
    diff: &FileDiff,
    span: &Location,
) -> Result<(Location, bool), TranslationFailure> {
    let mut original: Vec<&str> = Vec::with_capacity(span.line_count() as usize);
    for line in span.line_start..=span.line_end {
        let Some(text) = covering_hunk(diff, line)
            .and_then(|hunk| hunk.removed.get((line - hunk.old_start) as usize))
        else {
            return Err(TranslationFailure::Deleted {
                detail: format!("line {line} was removed and its content is unavailable"),
            });
        };
        original.push(text);
    }

    let mut relocations: Vec<u32> = Vec::new();
    for hunk in &diff.hunks {
        if !touches(hunk, span.line_start, span.line_end) || hunk.added.len() < original.len() {
            continue;
        }
        for (offset, window) in hunk.added.windows(original.len()).enumerate() {
            if window.iter().map(String::as_str).eq(original.iter().copied()) {
                relocations.push(hunk.new_start + offset as u32);
            }
        }
    }

    match relocations.as_slice() {
        [] => Err(TranslationFailure::Deleted {
            detail: format!(
                "all {} line(s) of the span were removed with no surviving context",
                span.line_count()
            ),
        }),
        [line] => Ok((
            Location::new(
                *line,
                span.col_start,
                line + original.len() as u32 - 1,
                span.col_end,
            ),
            true,
        )),
        _ => Err(TranslationFailure::Ambiguous {
            matches: relocations.len(),
        }),
    }
}

fn line_width(lines: &[&str], line: u32) -> u32 {
    lines
        .get(line as usize)
        .map(|text| text.chars().count() as u32)
        .unwrap_or(0)
}
