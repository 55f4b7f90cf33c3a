//! Unified-diff rendering.

use crate::{DiffRecord, Hunk, HunkRange, LineEdit};
use similar::{capture_diff_slices, Algorithm, DiffTag};
use std::hash::Hash;

/// Render the unified diff between two line sequences.
///
/// `context` unchanged lines surround each change run; runs separated by at
/// most `2 * context` unchanged lines share one hunk. Identical inputs always
/// produce byte-identical output.
pub fn render<S>(
    original_path: &str,
    target_path: &str,
    original: &[S],
    edited: &[S],
    context: usize,
) -> String
where
    S: AsRef<str> + Eq + Hash + Ord,
{
    DiffRecord::between(original_path, target_path, original, edited, context).to_string()
}

/// One line of the full edit script with the cursors in front of it.
struct ScriptLine {
    edit: LineEdit,
    old_pos: usize,
    new_pos: usize,
}

impl ScriptLine {
    fn is_change(&self) -> bool {
        !matches!(self.edit, LineEdit::Context(_))
    }
}

/// Expand the diff ops into one entry per line.
///
/// Positions are tracked from op lengths alone, so every line knows exactly
/// where it sits on both sides.
fn edit_script<S>(original: &[S], edited: &[S]) -> Vec<ScriptLine>
where
    S: AsRef<str> + Eq + Hash + Ord,
{
    let mut script = Vec::with_capacity(original.len().max(edited.len()));
    let (mut old_pos, mut new_pos) = (0usize, 0usize);

    for op in capture_diff_slices(Algorithm::Myers, original, edited) {
        let (tag, old, new) = op.as_tag_tuple();
        let (old_len, new_len) = (old.len(), new.len());

        match tag {
            DiffTag::Equal => {
                for line in &original[old_pos..old_pos + old_len] {
                    script.push(ScriptLine {
                        edit: LineEdit::Context(line.as_ref().to_string()),
                        old_pos,
                        new_pos,
                    });
                    old_pos += 1;
                    new_pos += 1;
                }
            }
            DiffTag::Delete | DiffTag::Insert | DiffTag::Replace => {
                // Removed lines come first within a replaced block.
                for line in &original[old_pos..old_pos + old_len] {
                    script.push(ScriptLine {
                        edit: LineEdit::Removed(line.as_ref().to_string()),
                        old_pos,
                        new_pos,
                    });
                    old_pos += 1;
                }
                for line in &edited[new_pos..new_pos + new_len] {
                    script.push(ScriptLine {
                        edit: LineEdit::Added(line.as_ref().to_string()),
                        old_pos,
                        new_pos,
                    });
                    new_pos += 1;
                }
            }
        }
    }

    script
}

/// Split the script into `(begin, end)` line spans, one per hunk.
fn hunk_spans(script: &[ScriptLine], context: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut idx = 0;

    while idx < script.len() {
        if !script[idx].is_change() {
            idx += 1;
            continue;
        }

        let begin = idx.saturating_sub(context);
        let mut changes_end = idx;
        loop {
            while changes_end < script.len() && script[changes_end].is_change() {
                changes_end += 1;
            }
            let mut next = changes_end;
            while next < script.len() && !script[next].is_change() {
                next += 1;
            }
            if next < script.len() && next - changes_end <= 2 * context {
                changes_end = next;
            } else {
                break;
            }
        }

        let end = (changes_end + context).min(script.len());
        spans.push((begin, end));
        idx = end;
    }

    spans
}

impl DiffRecord {
    /// Compute the record describing how `original` becomes `edited`.
    ///
    /// The edit script is minimal (Myers), so the retained lines form a
    /// longest common subsequence of the two inputs. Each hunk's ranges are
    /// counted from its own edits.
    pub fn between<S>(
        original_path: &str,
        target_path: &str,
        original: &[S],
        edited: &[S],
        context: usize,
    ) -> Self
    where
        S: AsRef<str> + Eq + Hash + Ord,
    {
        let mut record = DiffRecord::new(original_path, target_path);
        let script = edit_script(original, edited);

        for (begin, end) in hunk_spans(&script, context) {
            let lines = &script[begin..end];
            let old_len = lines
                .iter()
                .filter(|l| !matches!(l.edit, LineEdit::Added(_)))
                .count();
            let new_len = lines
                .iter()
                .filter(|l| !matches!(l.edit, LineEdit::Removed(_)))
                .count();
            let (old_start, new_start) = (lines[0].old_pos, lines[0].new_pos);

            let mut hunk = Hunk::new(
                HunkRange::from_span(old_start, old_start + old_len),
                HunkRange::from_span(new_start, new_start + new_len),
            );
            hunk.edits = lines.iter().map(|l| l.edit.clone()).collect();
            record.hunks.push(hunk);
        }

        record
    }
}
