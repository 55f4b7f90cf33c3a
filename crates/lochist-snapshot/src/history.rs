//! Browsing and restoring stored history.

use crate::{SnapshotError, SnapshotResult};
use lochist_diff::{apply, join_lines, parse, split_lines, DiffRecord};
use lochist_util::path::{safe_join, to_slash};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// A stored diff together with the content it reconstructs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub record: DiffRecord,
    /// Lines of the baseline copy the diff was computed against.
    pub original: Vec<String>,
    /// Lines of the file at the time the diff was written.
    pub reconstructed: Vec<String>,
}

impl Reconstruction {
    pub fn original_text(&self) -> String {
        join_lines(&self.original)
    }

    pub fn reconstructed_text(&self) -> String {
        join_lines(&self.reconstructed)
    }
}

/// Reads diff files and rebuilds past file content.
///
/// Header paths inside diff files are resolved against the project root and
/// may not escape it.
#[derive(Debug, Clone)]
pub struct History {
    project_root: PathBuf,
}

impl History {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Parse a diff file. Relative paths are taken from the project root.
    pub async fn load(&self, diff_path: &Path) -> SnapshotResult<DiffRecord> {
        let path = self.project_root.join(diff_path);
        let text = read_existing(&path).await?;
        Ok(parse(&text)?)
    }

    /// Apply a diff file to the baseline copy named in its `---` header.
    pub async fn reconstruct(&self, diff_path: &Path) -> SnapshotResult<Reconstruction> {
        let record = self.load(diff_path).await?;
        let original_path = self.resolve(&record.original_path)?;
        let original = split_lines(&read_existing(&original_path).await?);
        let reconstructed = apply(&original, &record)?;

        Ok(Reconstruction {
            record,
            original,
            reconstructed,
        })
    }

    /// Unified diff from the reconstructed content to the file's current
    /// content. A deleted file compares against empty content.
    pub async fn compare_with_current(
        &self,
        diff_path: &Path,
        context: usize,
    ) -> SnapshotResult<String> {
        let reconstruction = self.reconstruct(diff_path).await?;
        let current_path = self.resolve(&reconstruction.record.target_path)?;
        let current = match fs::read_to_string(&current_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let label = match self.project_root.join(diff_path).strip_prefix(&self.project_root) {
            Ok(relative) => to_slash(relative),
            Err(_) => diff_path.display().to_string(),
        };

        Ok(lochist_diff::render(
            &label,
            &reconstruction.record.target_path,
            &reconstruction.reconstructed,
            &split_lines(&current),
            context,
        ))
    }

    /// Write the reconstructed content to `destination`, or back to the
    /// file named in the diff's `+++` header.
    ///
    /// Returns the path written.
    pub async fn restore(
        &self,
        diff_path: &Path,
        destination: Option<&Path>,
    ) -> SnapshotResult<PathBuf> {
        let reconstruction = self.reconstruct(diff_path).await?;
        let target = match destination {
            Some(path) => path.to_path_buf(),
            None => self.resolve(&reconstruction.record.target_path)?,
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, reconstruction.reconstructed_text()).await?;
        info!("Restored {:?} from {:?}", target, diff_path);

        Ok(target)
    }

    fn resolve(&self, label: &str) -> SnapshotResult<PathBuf> {
        if label.is_empty() {
            return Err(SnapshotError::invalid_path("diff header has no path"));
        }
        safe_join(&self.project_root, Path::new(label))
            .ok_or_else(|| SnapshotError::invalid_path(label))
    }
}

async fn read_existing(path: &Path) -> SnapshotResult<String> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(SnapshotError::not_found(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChangeDetector, ExcludeRules, FileChange, SnapshotStore};
    use lochist_test_utils::{BuiltTestProject, StepClock, TestProject};
    use std::sync::Arc;

    /// Baseline the project, apply `edit`, and store one diff for `file`.
    async fn record_change(
        project: &BuiltTestProject,
        file: &str,
        edit: &str,
        context: usize,
    ) -> PathBuf {
        let store = SnapshotStore::new(
            project.path(),
            ".lochist",
            ExcludeRules::with_defaults(".lochist"),
            Arc::new(StepClock::default()),
        );
        let baseline = store.create_baseline().await.unwrap();
        project.write_file(file, edit);

        let relative = Path::new(file);
        let change = ChangeDetector::new(context)
            .detect(
                &baseline.copy_of(relative),
                &project.path().join(relative),
                &store.baseline_label(&baseline, relative),
                file,
            )
            .await
            .unwrap();
        let FileChange::Modified { text, .. } = change else {
            panic!("expected a modification");
        };

        let mut cycle = store.begin_diff_cycle();
        let path = store.write_diff(&mut cycle, relative, &text).await.unwrap();
        store.commit_diff_cycle(cycle).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reconstruct_rebuilds_recorded_content() {
        let project = TestProject::new().with_file("src/a.txt", "1\n2\n3\n").build();
        let diff = record_change(&project, "src/a.txt", "1\n2\n4\n", 0).await;

        // Later edits do not affect what the diff reconstructs.
        project.write_file("src/a.txt", "changed again\n");

        let history = History::new(project.path());
        let reconstruction = history.reconstruct(&diff).await.unwrap();
        assert_eq!(reconstruction.original_text(), "1\n2\n3\n");
        assert_eq!(reconstruction.reconstructed_text(), "1\n2\n4\n");
        assert_eq!(reconstruction.record.target_path, "src/a.txt");
    }

    #[tokio::test]
    async fn test_load_accepts_relative_paths() {
        let project = TestProject::new().with_file("a.txt", "x\n").build();
        let diff = record_change(&project, "a.txt", "y\n", 1).await;
        let relative = diff.strip_prefix(project.path()).unwrap();

        let record = History::new(project.path()).load(relative).await.unwrap();
        assert_eq!(record.hunks.len(), 1);
        assert_eq!(record.target_path, "a.txt");
    }

    #[tokio::test]
    async fn test_restore_defaults_to_target_path() {
        let project = TestProject::new().with_file("a.txt", "one\ntwo\n").build();
        let diff = record_change(&project, "a.txt", "one\nTWO\n", 2).await;
        project.write_file("a.txt", "lost\n");

        let written = History::new(project.path())
            .restore(&diff, None)
            .await
            .unwrap();
        assert_eq!(written, project.path().join("a.txt"));
        assert_eq!(project.read_file("a.txt"), "one\nTWO\n");
    }

    #[tokio::test]
    async fn test_restore_to_destination_creates_parents() {
        let project = TestProject::new().with_file("a.txt", "one\n").build();
        let diff = record_change(&project, "a.txt", "two\n", 0).await;

        let destination = project.path().join("restored/deep/a.txt");
        History::new(project.path())
            .restore(&diff, Some(&destination))
            .await
            .unwrap();
        assert_eq!(project.read_file("restored/deep/a.txt"), "two\n");
        assert_eq!(project.read_file("a.txt"), "two\n");
    }

    #[tokio::test]
    async fn test_compare_with_current() {
        let project = TestProject::new().with_file("a.txt", "1\n2\n3\n").build();
        let diff = record_change(&project, "a.txt", "1\n2\n4\n", 0).await;
        project.write_file("a.txt", "1\n2\n5\n");

        let history = History::new(project.path());
        let text = history.compare_with_current(&diff, 0).await.unwrap();
        let record = parse(&text).unwrap();
        assert_eq!(record.target_path, "a.txt");
        assert!(record.original_path.ends_with("a.txt.diff"));
        assert_eq!(record.hunks[0].removed().collect::<Vec<_>>(), vec!["4"]);
        assert_eq!(record.hunks[0].added().collect::<Vec<_>>(), vec!["5"]);
    }

    #[tokio::test]
    async fn test_compare_with_deleted_file() {
        let project = TestProject::new().with_file("a.txt", "1\n").build();
        let diff = record_change(&project, "a.txt", "2\n", 0).await;
        project.delete_file("a.txt");

        let text = History::new(project.path())
            .compare_with_current(&diff, 0)
            .await
            .unwrap();
        let record = parse(&text).unwrap();
        assert_eq!(record.hunks[0].removed().collect::<Vec<_>>(), vec!["2"]);
        assert_eq!(record.stats().added, 0);
    }

    #[tokio::test]
    async fn test_missing_diff_is_not_found() {
        let project = TestProject::new().build();
        let err = History::new(project.path())
            .load(Path::new("nope.diff"))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_baseline_copy_is_not_found() {
        let project = TestProject::new()
            .with_file("x.diff", "--- gone/a.txt\n+++ a.txt\n@@ -1,1 +1,1 @@\n-a\n+b\n")
            .build();
        let err = History::new(project.path())
            .reconstruct(Path::new("x.diff"))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_header_paths_cannot_escape_root() {
        let project = TestProject::new()
            .with_file("base.txt", "a\n")
            .with_file("x.diff", "--- base.txt\n+++ ../../outside.txt\n@@ -1,1 +1,1 @@\n-a\n+b\n")
            .build();
        let err = History::new(project.path())
            .restore(Path::new("x.diff"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_malformed_diff_is_diff_error() {
        let project = TestProject::new().with_file("x.diff", "-orphan\n").build();
        let err = History::new(project.path())
            .load(Path::new("x.diff"))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Diff(_)));
    }
}
