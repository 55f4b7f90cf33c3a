//! Unified-diff parser.

use crate::{DiffError, DiffRecord, DiffResult, Hunk, HunkRange, LineEdit};

/// Parse unified-diff text into a [`DiffRecord`].
///
/// - `--- <path>` / `+++ <path>` set the original and target paths
/// - `@@ -start[,len] +start[,len] @@` opens a hunk; a missing length is 1
/// - `-`, `+` and ` ` lines are removed, added and context edits of the
///   current hunk
/// - anything else (including `\ No newline at end of file`) is ignored
///
/// While a hunk still expects lines according to its header counts, `---` and
/// `+++` lines are treated as edits, so removing a line that itself starts
/// with `--` parses correctly.
pub fn parse(text: &str) -> DiffResult<DiffRecord> {
    let mut record = DiffRecord::default();
    let mut current: Option<Hunk> = None;
    let mut remaining_original = 0usize;
    let mut remaining_target = 0usize;

    for (idx, line) in text.split('\n').enumerate() {
        let line_no = idx + 1;
        let in_body = remaining_original > 0 || remaining_target > 0;

        if !in_body {
            if let Some(rest) = line.strip_prefix("---") {
                record.original_path = header_path(rest);
                continue;
            }
            if let Some(rest) = line.strip_prefix("+++") {
                record.target_path = header_path(rest);
                continue;
            }
        }

        if line.starts_with("@@") {
            let (original, target) = parse_hunk_header(line, line_no)?;
            if let Some(hunk) = current.take() {
                record.hunks.push(hunk);
            }
            check_order(&record, &original, line_no)?;
            remaining_original = original.len;
            remaining_target = target.len;
            current = Some(Hunk::new(original, target));
            continue;
        }

        let Some(marker) = line.chars().next() else {
            continue;
        };
        let body = &line[marker.len_utf8()..];

        let edit = match marker {
            '-' => {
                remaining_original = remaining_original.saturating_sub(1);
                LineEdit::Removed(body.to_string())
            }
            '+' => {
                remaining_target = remaining_target.saturating_sub(1);
                LineEdit::Added(body.to_string())
            }
            ' ' if current.is_some() => {
                remaining_original = remaining_original.saturating_sub(1);
                remaining_target = remaining_target.saturating_sub(1);
                LineEdit::Context(body.to_string())
            }
            _ => continue,
        };

        match current.as_mut() {
            Some(hunk) => hunk.edits.push(edit),
            None => {
                return Err(DiffError::malformed(
                    line_no,
                    format!("edit line {:?} before any hunk header", line),
                ))
            }
        }
    }

    if let Some(hunk) = current.take() {
        record.hunks.push(hunk);
    }

    Ok(record)
}

/// Path text after a `---`/`+++` marker, without any tab-separated timestamp.
fn header_path(rest: &str) -> String {
    rest.split('\t').next().unwrap_or_default().trim().to_string()
}

fn parse_hunk_header(line: &str, line_no: usize) -> DiffResult<(HunkRange, HunkRange)> {
    let mut tokens = line.split_whitespace().skip(1);

    let original = tokens
        .next()
        .and_then(|t| t.strip_prefix('-'))
        .ok_or_else(|| DiffError::malformed(line_no, "missing original range"))?;
    let target = tokens
        .next()
        .and_then(|t| t.strip_prefix('+'))
        .ok_or_else(|| DiffError::malformed(line_no, "missing target range"))?;

    Ok((
        parse_range(original, line_no)?,
        parse_range(target, line_no)?,
    ))
}

fn parse_range(token: &str, line_no: usize) -> DiffResult<HunkRange> {
    let (start, len) = match token.split_once(',') {
        Some((start, len)) => (start, Some(len)),
        None => (token, None),
    };

    let start: usize = start
        .parse()
        .map_err(|_| DiffError::malformed(line_no, format!("invalid range start {:?}", start)))?;
    let len: usize = match len {
        Some(len) => len
            .parse()
            .map_err(|_| DiffError::malformed(line_no, format!("invalid range length {:?}", len)))?,
        None => 1,
    };

    if start == 0 && len > 0 {
        return Err(DiffError::malformed(
            line_no,
            "non-empty range cannot start at line 0",
        ));
    }

    Ok(HunkRange::new(start, len))
}

/// Hunks must arrive in ascending original order without overlapping.
fn check_order(record: &DiffRecord, next: &HunkRange, line_no: usize) -> DiffResult<()> {
    if let Some(previous) = record.hunks.last() {
        if next.position() < previous.original.end() {
            return Err(DiffError::malformed(
                line_no,
                format!(
                    "hunk at original line {} overlaps or precedes the previous hunk",
                    next.start
                ),
            ));
        }
    }
    Ok(())
}
