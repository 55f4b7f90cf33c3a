//! Patch reconstruction.

use crate::{join_lines, split_lines, DiffError, DiffRecord, DiffResult, LineEdit};

/// Apply a parsed diff to the original lines, producing the lines of the
/// diff's target revision.
///
/// Lines before each hunk and after the last hunk are copied verbatim. Inside
/// a hunk, removed lines advance the original cursor without output, added
/// lines are emitted without advancing, and context lines emit the original
/// line at the cursor and advance.
pub fn apply<S: AsRef<str>>(original: &[S], record: &DiffRecord) -> DiffResult<Vec<String>> {
    let mut output = Vec::with_capacity(original.len());
    let mut cursor = 0usize;

    for hunk in &record.hunks {
        let position = hunk.original.position();
        let past_end = if hunk.original.len > 0 {
            hunk.original.start > original.len()
        } else {
            position > original.len()
        };
        if past_end {
            return Err(DiffError::RangeOutOfBounds {
                start: hunk.original.start,
                available: original.len(),
            });
        }
        if position < cursor {
            return Err(DiffError::MalformedDiff(format!(
                "hunk at original line {} overlaps or precedes the previous hunk",
                hunk.original.start
            )));
        }

        output.extend(original[cursor..position].iter().map(|l| l.as_ref().to_string()));
        cursor = position;

        for edit in &hunk.edits {
            match edit {
                LineEdit::Added(text) => output.push(text.clone()),
                LineEdit::Removed(_) | LineEdit::Context(_) => {
                    let Some(line) = original.get(cursor) else {
                        return Err(DiffError::RangeOutOfBounds {
                            start: hunk.original.start,
                            available: original.len(),
                        });
                    };
                    if matches!(edit, LineEdit::Context(_)) {
                        output.push(line.as_ref().to_string());
                    }
                    cursor += 1;
                }
            }
        }
    }

    output.extend(original[cursor..].iter().map(|l| l.as_ref().to_string()));
    Ok(output)
}

/// Apply a diff to whole file text.
pub fn apply_text(original: &str, record: &DiffRecord) -> DiffResult<String> {
    let lines = apply(&split_lines(original), record)?;
    Ok(join_lines(&lines))
}
