//! Converts external diff representations into the engine's hunk model:
//! textual unified patches coming back from the version-control backend,
//! and computed diffs between a committed state and the live buffer.

use anyhow::Context;
use anyhow::Result;
use pinpoint_protocol::DiffHunk;
use pinpoint_protocol::FileDiff;
use similar::DiffTag;
use similar::TextDiff;
use std::ops::Range;

/// Compute the hunks between two buffer states, old → new. Used for the
/// trailing dirty-buffer diff of a revision chain.
pub fn diff_lines(old: &str, new: &str) -> FileDiff {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let diff = TextDiff::from_lines(old, new);

    let mut hunks = Vec::new();
    for op in diff.ops() {
        if op.tag() == DiffTag::Equal {
            continue;
        }
        let old_range = op.old_range();
        let new_range = op.new_range();
        hunks.push(DiffHunk {
            old_start: old_range.start as u32,
            old_lines: old_range.len() as u32,
            new_start: new_range.start as u32,
            new_lines: new_range.len() as u32,
            removed: collect_lines(&old_lines, old_range),
            added: collect_lines(&new_lines, new_range),
        });
    }
    FileDiff { hunks }
}

/// Parse a textual unified diff (as produced by `git diff`) into hunks.
/// Anything before the `---` header (the git preamble) is skipped. Context
/// lines inside a unified hunk split it into separate modified runs, each
/// emitted as its own [`DiffHunk`].
pub fn parse_unified(patch: &str) -> Result<FileDiff> {
    let Some(body) = unified_body(patch) else {
        if patch.contains("\n@@ ") || patch.starts_with("@@ ") {
            anyhow::bail!("unified diff has hunks but no ---/+++ header");
        }
        return Ok(FileDiff::default());
    };
    if body.trim().is_empty() {
        return Ok(FileDiff::default());
    }
    let parsed = diffy::Patch::from_str(body).context("malformed unified diff")?;

    let mut hunks = Vec::new();
    for hunk in parsed.hunks() {
        let mut old_pos = zero_based(hunk.old_range());
        let mut new_pos = zero_based(hunk.new_range());
        let mut run_old_start = old_pos;
        let mut run_new_start = new_pos;
        let mut removed: Vec<String> = Vec::new();
        let mut added: Vec<String> = Vec::new();

        for line in hunk.lines() {
            match line {
                diffy::Line::Context(_) => {
                    flush_run(&mut hunks, run_old_start, run_new_start, &mut removed, &mut added);
                    old_pos += 1;
                    new_pos += 1;
                    run_old_start = old_pos;
                    run_new_start = new_pos;
                }
                diffy::Line::Delete(text) => {
                    removed.push(strip_newline(text).to_string());
                    old_pos += 1;
                }
                diffy::Line::Insert(text) => {
                    added.push(strip_newline(text).to_string());
                    new_pos += 1;
                }
            }
        }
        flush_run(&mut hunks, run_old_start, run_new_start, &mut removed, &mut added);
    }
    Ok(FileDiff { hunks })
}

fn collect_lines(lines: &[&str], range: Range<usize>) -> Vec<String> {
    lines
        .get(range)
        .unwrap_or(&[])
        .iter()
        .map(|line| line.to_string())
        .collect()
}

fn flush_run(
    hunks: &mut Vec<DiffHunk>,
    old_start: u32,
    new_start: u32,
    removed: &mut Vec<String>,
    added: &mut Vec<String>,
) {
    if removed.is_empty() && added.is_empty() {
        return;
    }
    hunks.push(DiffHunk {
        old_start,
        old_lines: removed.len() as u32,
        new_start,
        new_lines: added.len() as u32,
        removed: std::mem::take(removed),
        added: std::mem::take(added),
    });
}

/// Unified ranges are 1-based; a zero-length range names the line the
/// change lands after, which already is the 0-based insertion point.
fn zero_based(range: diffy::HunkRange) -> u32 {
    let start = range.start() as u32;
    if range.len() == 0 {
        start
    } else {
        start.saturating_sub(1)
    }
}

/// A headerless patch with no hunks (e.g. a mode-only change) carries no
/// content edits; a headerless patch that still has hunk markers is
/// malformed and must fail loudly rather than truncate.
fn unified_body(patch: &str) -> Option<&str> {
    if patch.starts_with("--- ") {
        return Some(patch);
    }
    match patch.find("\n--- ") {
        Some(idx) => Some(&patch[idx + 1..]),
        None => None,
    }
}

fn strip_newline(text: &str) -> &str {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.strip_suffix('\r').unwrap_or(text)
}
