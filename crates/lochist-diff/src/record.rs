//! Parsed representation of a unified diff.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Split file text into lines on `\n`.
///
/// The final element is whatever follows the last newline, so text ending in
/// `\n` yields a trailing empty line. Carriage returns stay part of the line.
/// [`join_lines`] is the exact inverse.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

/// Join lines produced by [`split_lines`] back into file text.
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut text = String::new();
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            text.push('\n');
        }
        text.push_str(line.as_ref());
    }
    text
}

/// One side of a hunk header, as written in `@@ -start,len +start,len @@`.
///
/// `start` is 1-based when `len > 0`. For an empty range it names the line
/// after which the change applies (`0` meaning the top of the file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkRange {
    pub start: usize,
    pub len: usize,
}

impl HunkRange {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Build a range from a 0-based half-open span of line indices.
    pub fn from_span(begin: usize, end: usize) -> Self {
        let len = end.saturating_sub(begin);
        let start = if len == 0 { begin } else { begin + 1 };
        Self { start, len }
    }

    /// 0-based index of the first line covered by the range. For an empty
    /// range this is the index the change is inserted before.
    pub fn position(&self) -> usize {
        if self.len == 0 {
            self.start
        } else {
            self.start.saturating_sub(1)
        }
    }

    /// 0-based index one past the last covered line.
    pub fn end(&self) -> usize {
        self.position() + self.len
    }
}

impl fmt::Display for HunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start, self.len)
    }
}

/// A single line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum LineEdit {
    /// Unchanged line shown around a change (` ` prefix).
    Context(String),
    /// Line present only in the original (`-` prefix).
    Removed(String),
    /// Line present only in the edited version (`+` prefix).
    Added(String),
}

impl LineEdit {
    /// The line content without its marker.
    pub fn text(&self) -> &str {
        match self {
            LineEdit::Context(text) | LineEdit::Removed(text) | LineEdit::Added(text) => text,
        }
    }

    /// The unified-diff marker character.
    pub fn marker(&self) -> char {
        match self {
            LineEdit::Context(_) => ' ',
            LineEdit::Removed(_) => '-',
            LineEdit::Added(_) => '+',
        }
    }
}

/// A contiguous block of changes between two line ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub original: HunkRange,
    pub target: HunkRange,
    pub edits: Vec<LineEdit>,
}

impl Hunk {
    pub fn new(original: HunkRange, target: HunkRange) -> Self {
        Self {
            original,
            target,
            edits: Vec::new(),
        }
    }

    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.edits.iter().filter_map(|e| match e {
            LineEdit::Removed(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn added(&self) -> impl Iterator<Item = &str> {
        self.edits.iter().filter_map(|e| match e {
            LineEdit::Added(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Line counts of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

/// A parsed single-file unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRecord {
    /// Path after the `---` marker.
    pub original_path: String,
    /// Path after the `+++` marker.
    pub target_path: String,
    /// Hunks in ascending order of original position.
    pub hunks: Vec<Hunk>,
}

impl DiffRecord {
    pub fn new(original_path: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            original_path: original_path.into(),
            target_path: target_path.into(),
            hunks: Vec::new(),
        }
    }

    /// True when the record describes no change.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats::default();
        for edit in self.hunks.iter().flat_map(|h| &h.edits) {
            match edit {
                LineEdit::Added(_) => stats.added += 1,
                LineEdit::Removed(_) => stats.removed += 1,
                LineEdit::Context(_) => {}
            }
        }
        stats
    }
}

/// Serializes the record as unified-diff text. Every line, including the
/// last, is terminated by `\n`.
impl fmt::Display for DiffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {}", self.original_path)?;
        writeln!(f, "+++ {}", self.target_path)?;
        for hunk in &self.hunks {
            writeln!(f, "@@ -{} +{} @@", hunk.original, hunk.target)?;
            for edit in &hunk.edits {
                writeln!(f, "{}{}", edit.marker(), edit.text())?;
            }
        }
        Ok(())
    }
}
