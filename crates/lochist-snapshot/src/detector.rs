//! Per-file change detection against a baseline copy.

use crate::SnapshotResult;
use lochist_diff::{split_lines, DiffRecord};
use std::io;
use std::path::Path;
use tokio::fs;

/// Outcome of comparing a file with its baseline copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// Line-for-line identical.
    Unchanged,
    /// No baseline copy exists.
    Added,
    /// Content differs.
    Modified {
        record: DiffRecord,
        /// Unified-diff text of `record`.
        text: String,
    },
}

impl FileChange {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FileChange::Unchanged)
    }
}

/// Compares current files with their baseline copies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector {
    context_lines: usize,
}

impl ChangeDetector {
    pub fn new(context_lines: usize) -> Self {
        Self { context_lines }
    }

    pub fn context_lines(&self) -> usize {
        self.context_lines
    }

    /// Diff `current_path` against `baseline_path`.
    ///
    /// The labels become the `---` and `+++` header paths. Both files are
    /// read as UTF-8; anything else is an IO error for this file.
    pub async fn detect(
        &self,
        baseline_path: &Path,
        current_path: &Path,
        original_label: &str,
        target_label: &str,
    ) -> SnapshotResult<FileChange> {
        if !fs::try_exists(baseline_path).await? {
            return Ok(FileChange::Added);
        }

        let baseline = read_text(baseline_path).await?;
        let current = read_text(current_path).await?;
        if baseline == current {
            return Ok(FileChange::Unchanged);
        }

        let record = DiffRecord::between(
            original_label,
            target_label,
            &split_lines(&baseline),
            &split_lines(&current),
            self.context_lines,
        );
        if record.is_empty() {
            return Ok(FileChange::Unchanged);
        }

        let text = record.to_string();
        Ok(FileChange::Modified { record, text })
    }
}

async fn read_text(path: &Path) -> SnapshotResult<String> {
    let bytes = fs::read(path).await?;
    String::from_utf8(bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is not valid UTF-8: {}", path.display(), e),
        )
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SnapshotError;
    use lochist_diff::{apply_text, HunkRange};
    use lochist_test_utils::TestProject;

    #[tokio::test]
    async fn test_single_line_change() {
        let project = TestProject::new()
            .with_file("base/a.txt", "1\n2\n3\n")
            .with_file("a.txt", "1\n2\n4\n")
            .build();

        let change = ChangeDetector::default()
            .detect(
                &project.path().join("base/a.txt"),
                &project.path().join("a.txt"),
                "base/a.txt",
                "a.txt",
            )
            .await
            .unwrap();

        let FileChange::Modified { record, text } = change else {
            panic!("expected a modification, got {:?}", change);
        };
        assert_eq!(record.hunks.len(), 1);
        assert_eq!(record.hunks[0].original, HunkRange::new(3, 1));
        assert_eq!(record.hunks[0].removed().collect::<Vec<_>>(), vec!["3"]);
        assert_eq!(record.hunks[0].added().collect::<Vec<_>>(), vec!["4"]);
        assert_eq!(text, "--- base/a.txt\n+++ a.txt\n@@ -3,1 +3,1 @@\n-3\n+4\n");
        assert_eq!(apply_text("1\n2\n3\n", &record).unwrap(), "1\n2\n4\n");
    }

    #[tokio::test]
    async fn test_identical_content_is_unchanged() {
        for content in ["", "\n", "x", "a\r\nb\r\n", "same\nlines\n"] {
            let project = TestProject::new()
                .with_file("base.txt", content)
                .with_file("cur.txt", content)
                .build();

            let change = ChangeDetector::new(3)
                .detect(
                    &project.path().join("base.txt"),
                    &project.path().join("cur.txt"),
                    "a",
                    "b",
                )
                .await
                .unwrap();
            assert!(change.is_unchanged(), "{:?}", content);
        }
    }

    #[tokio::test]
    async fn test_missing_baseline_is_added() {
        let project = TestProject::new().with_file("new.txt", "hi\n").build();
        let change = ChangeDetector::default()
            .detect(
                &project.path().join("base/new.txt"),
                &project.path().join("new.txt"),
                "a",
                "b",
            )
            .await
            .unwrap();
        assert_eq!(change, FileChange::Added);
    }

    #[tokio::test]
    async fn test_trailing_newline_and_crlf_are_content_changes() {
        for (before, after) in [("a\n", "a"), ("a\r\nb\r\n", "a\nb\n")] {
            let project = TestProject::new()
                .with_file("base.txt", before)
                .with_file("cur.txt", after)
                .build();

            let change = ChangeDetector::default()
                .detect(
                    &project.path().join("base.txt"),
                    &project.path().join("cur.txt"),
                    "a",
                    "b",
                )
                .await
                .unwrap();
            let FileChange::Modified { record, .. } = change else {
                panic!("expected a modification for {:?}", before);
            };
            assert_eq!(apply_text(before, &record).unwrap(), after);
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_io_error() {
        let project = TestProject::new().with_file("base.bin", "x").build();
        std::fs::write(project.path().join("cur.bin"), [0xff, 0xfe, 0x00]).unwrap();

        let err = ChangeDetector::default()
            .detect(
                &project.path().join("base.bin"),
                &project.path().join("cur.bin"),
                "a",
                "b",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Io(ref e) if e.kind() == io::ErrorKind::InvalidData));
    }

    #[tokio::test]
    async fn test_missing_current_is_io_error() {
        let project = TestProject::new().with_file("base.txt", "x").build();
        let err = ChangeDetector::default()
            .detect(
                &project.path().join("base.txt"),
                &project.path().join("gone.txt"),
                "a",
                "b",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }
}
