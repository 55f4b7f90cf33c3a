//! Snapshot storage implementation.

use crate::walk::list_files;
use crate::{Baseline, ExcludeRules, SnapshotError, SnapshotResult};
use lochist_util::path::to_slash;
use lochist_util::{SharedClock, Timestamp};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Subtree holding full-copy baselines.
pub const VERSION_DIR: &str = "version";

/// Subtree holding per-cycle diff files.
pub const DIFF_DIR: &str = "diff";

/// Extension appended to a file name to form its diff file name.
pub const DIFF_EXTENSION: &str = "diff";

/// On-disk history for one project.
///
/// History lives in a store directory under the project root:
/// ```text
/// <project>/
///   .lochist/
///     version/
///       <timestamp>/
///         <relative_path>          # Full copies of every file
///     diff/
///       <timestamp>/
///         <relative_dir>/<name>.diff   # One unified diff per changed file
/// ```
pub struct SnapshotStore {
    /// Project root directory.
    project_root: PathBuf,

    /// Store directory name, relative to the project root.
    store_name: String,

    /// Names skipped when copying the project.
    rules: ExcludeRules,

    /// Source of folder names.
    clock: SharedClock,
}

/// A diff cycle in progress.
///
/// The cycle's folder is created when the first diff is written, so a pass
/// without changes leaves nothing on disk.
#[derive(Debug, Default)]
pub struct DiffCycle {
    folder: Option<(Timestamp, PathBuf)>,
    written: Vec<PathBuf>,
}

impl DiffCycle {
    /// Whether a folder has been created for this cycle.
    pub fn is_started(&self) -> bool {
        self.folder.is_some()
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_ref().map(|(_, path)| path.as_path())
    }

    /// Diff files written so far, as absolute paths.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

/// Result of committing a cycle that wrote at least one diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub timestamp: Timestamp,
    pub path: PathBuf,
    pub diff_count: usize,
}

/// A stored diff cycle and the diff files it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleEntry {
    pub timestamp: Timestamp,
    pub path: PathBuf,
    /// Diff files relative to the cycle folder.
    pub diffs: Vec<PathBuf>,
}

impl SnapshotStore {
    /// Create a store rooted at `project_root`.
    ///
    /// Nothing is written until a baseline or diff is created.
    pub fn new(
        project_root: impl Into<PathBuf>,
        store_name: impl Into<String>,
        rules: ExcludeRules,
        clock: SharedClock,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            store_name: store_name.into(),
            rules,
            clock,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn store_dir(&self) -> PathBuf {
        self.project_root.join(&self.store_name)
    }

    pub fn rules(&self) -> &ExcludeRules {
        &self.rules
    }

    pub fn version_dir(&self) -> PathBuf {
        self.store_dir().join(VERSION_DIR)
    }

    pub fn diff_dir(&self) -> PathBuf {
        self.store_dir().join(DIFF_DIR)
    }

    /// Create the `version` and `diff` subtrees if they are missing.
    async fn ensure_layout(&self) -> SnapshotResult<()> {
        fs::create_dir_all(self.version_dir()).await?;
        fs::create_dir_all(self.diff_dir()).await?;
        Ok(())
    }

    /// Copy every non-excluded project file into a new `version/<timestamp>`
    /// folder.
    ///
    /// Any failure discards the partial copy and is returned as
    /// [`SnapshotError::BaselineFailed`].
    pub async fn create_baseline(&self) -> SnapshotResult<Baseline> {
        self.ensure_layout().await?;

        let timestamp = self.clock.now();
        let folder = self.version_dir().join(timestamp.as_str());
        fs::create_dir(&folder)
            .await
            .map_err(|source| SnapshotError::BaselineFailed {
                path: folder.clone(),
                source,
            })?;

        match self.copy_project(&folder).await {
            Ok(files) => {
                info!(
                    "Created baseline {} with {} files",
                    timestamp,
                    files.len()
                );
                Ok(Baseline::new(timestamp, folder, files))
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&folder).await {
                    warn!(
                        "Failed to remove partial baseline {:?}: {}",
                        folder, cleanup
                    );
                }
                Err(e)
            }
        }
    }

    async fn copy_project(&self, folder: &Path) -> SnapshotResult<BTreeSet<PathBuf>> {
        let files = list_files(&self.project_root, Some(&self.rules))
            .await
            .map_err(|source| SnapshotError::BaselineFailed {
                path: self.project_root.clone(),
                source,
            })?;

        for file in &files {
            let src = self.project_root.join(file);
            let dst = folder.join(file);

            let copied = async {
                if let Some(parent) = dst.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::copy(&src, &dst).await
            }
            .await;

            copied.map_err(|source| SnapshotError::BaselineFailed {
                path: file.clone(),
                source,
            })?;
            debug!("Copied {:?}", file);
        }

        Ok(files)
    }

    /// The chronologically last baseline, or `None` if there is none.
    pub async fn latest_baseline(&self) -> SnapshotResult<Option<Baseline>> {
        let Some(timestamp) = timestamp_dirs(&self.version_dir()).await?.pop() else {
            return Ok(None);
        };
        self.load_baseline(timestamp).await.map(Some)
    }

    /// Every baseline, oldest first.
    pub async fn list_baselines(&self) -> SnapshotResult<Vec<Baseline>> {
        let mut baselines = Vec::new();
        for timestamp in timestamp_dirs(&self.version_dir()).await? {
            baselines.push(self.load_baseline(timestamp).await?);
        }
        Ok(baselines)
    }

    async fn load_baseline(&self, timestamp: Timestamp) -> SnapshotResult<Baseline> {
        let path = self.version_dir().join(timestamp.as_str());
        let files = list_files(&path, None).await?;
        Ok(Baseline::new(timestamp, path, files))
    }

    /// Start a diff cycle. No folder is created until the first write.
    pub fn begin_diff_cycle(&self) -> DiffCycle {
        DiffCycle::default()
    }

    /// Write one diff for a project-relative file into the cycle's folder.
    ///
    /// The diff lands at `diff/<timestamp>/<relative dir>/<name>.diff`.
    pub async fn write_diff(
        &self,
        cycle: &mut DiffCycle,
        relative: &Path,
        content: &str,
    ) -> SnapshotResult<PathBuf> {
        let name = diff_file_name(relative)?;

        let folder = match &cycle.folder {
            Some((_, folder)) => folder.clone(),
            None => {
                self.ensure_layout().await?;
                let timestamp = self.clock.now();
                let folder = self.diff_dir().join(timestamp.as_str());
                fs::create_dir_all(&folder).await?;
                debug!("Started diff cycle {}", timestamp);
                cycle.folder = Some((timestamp, folder.clone()));
                folder
            }
        };

        let target = folder.join(name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, content).await?;
        debug!("Wrote diff {:?}", target);

        cycle.written.push(target.clone());
        Ok(target)
    }

    /// Discard a cycle, deleting its folder if one was created.
    pub async fn abort_diff_cycle(&self, cycle: DiffCycle) -> SnapshotResult<()> {
        if let Some((timestamp, folder)) = cycle.folder {
            match fs::remove_dir_all(&folder).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            info!(
                "Discarded diff cycle {} ({} diffs)",
                timestamp,
                cycle.written.len()
            );
        }
        Ok(())
    }

    /// Finish a cycle, keeping its folder.
    ///
    /// Returns `None` when the cycle wrote nothing.
    pub fn commit_diff_cycle(&self, cycle: DiffCycle) -> Option<CycleSummary> {
        let (timestamp, path) = cycle.folder?;
        let summary = CycleSummary {
            timestamp,
            path,
            diff_count: cycle.written.len(),
        };
        info!(
            "Committed diff cycle {} ({} diffs)",
            summary.timestamp, summary.diff_count
        );
        Some(summary)
    }

    /// Every stored diff cycle, oldest first.
    pub async fn list_cycles(&self) -> SnapshotResult<Vec<CycleEntry>> {
        let mut cycles = Vec::new();
        for timestamp in timestamp_dirs(&self.diff_dir()).await? {
            let path = self.diff_dir().join(timestamp.as_str());
            let diffs = list_files(&path, None).await?.into_iter().collect();
            cycles.push(CycleEntry {
                timestamp,
                path,
                diffs,
            });
        }
        Ok(cycles)
    }

    /// Header label for the baseline copy of a project-relative file,
    /// written relative to the project root with `/` separators.
    pub fn baseline_label(&self, baseline: &Baseline, relative: &Path) -> String {
        let copy = baseline.copy_of(relative);
        match copy.strip_prefix(&self.project_root) {
            Ok(rel) => to_slash(rel),
            Err(_) => copy.display().to_string(),
        }
    }
}

/// Timestamp-named subdirectories of `dir`, sorted ascending. Other entries
/// are ignored; a missing `dir` has none.
async fn timestamp_dirs(dir: &Path) -> SnapshotResult<Vec<Timestamp>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut timestamps = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        match Timestamp::parse(&entry.file_name().to_string_lossy()) {
            Some(timestamp) => timestamps.push(timestamp),
            None => debug!("Ignoring {:?}", entry.path()),
        }
    }

    timestamps.sort();
    Ok(timestamps)
}

/// `<relative dir>/<name>.diff` for a project-relative file.
fn diff_file_name(relative: &Path) -> SnapshotResult<PathBuf> {
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(SnapshotError::invalid_path(relative.display().to_string()));
    }

    let Some(name) = relative.file_name() else {
        return Err(SnapshotError::invalid_path(relative.display().to_string()));
    };

    let mut file_name = name.to_os_string();
    file_name.push(".");
    file_name.push(DIFF_EXTENSION);
    Ok(relative.with_file_name(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lochist_test_utils::{BuiltTestProject, StepClock, TestProject};
    use std::sync::Arc;

    fn store_for(project: &BuiltTestProject) -> SnapshotStore {
        SnapshotStore::new(
            project.path(),
            ".lochist",
            ExcludeRules::with_defaults(".lochist"),
            Arc::new(StepClock::default()),
        )
    }

    #[tokio::test]
    async fn test_create_baseline_copies_non_excluded_files() {
        let project = TestProject::new()
            .with_sample_tree()
            .with_file(".git/HEAD", "ref: refs/heads/main\n")
            .with_file(".idea/workspace.xml", "<xml/>")
            .with_file(".gitignore", "target\n")
            .build();
        let store = store_for(&project);

        let baseline = store.create_baseline().await.unwrap();

        assert_eq!(baseline.timestamp.as_str(), "20240101_000000_000");
        assert_eq!(
            baseline.path,
            project.path().join(".lochist/version/20240101_000000_000")
        );
        assert_eq!(
            baseline.files,
            list_files(project.path(), Some(store.rules())).await.unwrap()
        );
        assert!(!baseline.contains(Path::new(".gitignore")));
        assert_eq!(
            project.read_file(".lochist/version/20240101_000000_000/src/main.rs"),
            lochist_test_utils::content::RUST_MAIN
        );
    }

    #[tokio::test]
    async fn test_latest_baseline_matches_created() {
        let project = TestProject::new().with_sample_tree().build();
        let store = store_for(&project);

        assert!(store.latest_baseline().await.unwrap().is_none());

        let first = store.create_baseline().await.unwrap();
        project.write_file("extra.txt", "x\n");
        let second = store.create_baseline().await.unwrap();

        let latest = store.latest_baseline().await.unwrap().unwrap();
        assert_eq!(latest, second);
        assert_ne!(latest.files, first.files);
        assert!(latest.contains(Path::new("extra.txt")));

        // The second baseline does not copy the first one.
        assert!(!latest
            .files
            .iter()
            .any(|f| f.starts_with(".lochist")));
    }

    #[tokio::test]
    async fn test_list_baselines_sorted_and_ignores_foreign_dirs() {
        let project = TestProject::new().with_file("a.txt", "a\n").build();
        let store = store_for(&project);

        store.create_baseline().await.unwrap();
        store.create_baseline().await.unwrap();
        project.write_file(".lochist/version/notes/readme.txt", "hi");

        let baselines = store.list_baselines().await.unwrap();
        let names: Vec<_> = baselines.iter().map(|b| b.timestamp.to_string()).collect();
        assert_eq!(names, vec!["20240101_000000_000", "20240101_000001_000"]);
    }

    #[tokio::test]
    async fn test_layout_is_reused() {
        let project = TestProject::new().with_file("a.txt", "a\n").build();
        let store = store_for(&project);

        store.create_baseline().await.unwrap();
        project.write_file(".lochist/version/marker", "keep");
        store.create_baseline().await.unwrap();

        assert!(project.file_exists(".lochist/version/marker"));
        assert_eq!(project.list_dirs(".lochist/version").len(), 2);
    }

    #[tokio::test]
    async fn test_diff_cycle_is_lazy() {
        let project = TestProject::new().with_file("a.txt", "a\n").build();
        let store = store_for(&project);

        let cycle = store.begin_diff_cycle();
        assert!(!cycle.is_started());
        assert!(store.commit_diff_cycle(cycle).is_none());
        assert!(!project.file_exists(".lochist/diff"));
    }

    #[tokio::test]
    async fn test_write_diff_mirrors_directories() {
        let project = TestProject::new().build();
        let store = store_for(&project);

        let mut cycle = store.begin_diff_cycle();
        let first = store
            .write_diff(&mut cycle, Path::new("a.txt"), "--- x\n+++ y\n")
            .await
            .unwrap();
        let second = store
            .write_diff(&mut cycle, Path::new("src/a.txt"), "--- p\n+++ q\n")
            .await
            .unwrap();

        let folder = cycle.folder().unwrap().to_path_buf();
        assert_eq!(first, folder.join("a.txt.diff"));
        assert_eq!(second, folder.join("src/a.txt.diff"));
        assert_eq!(cycle.written().len(), 2);

        let summary = store.commit_diff_cycle(cycle).unwrap();
        assert_eq!(summary.diff_count, 2);
        assert_eq!(summary.path, folder);

        let cycles = store.list_cycles().await.unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0].diffs,
            vec![PathBuf::from("a.txt.diff"), PathBuf::from("src/a.txt.diff")]
        );
    }

    #[tokio::test]
    async fn test_abort_diff_cycle_removes_folder() {
        let project = TestProject::new().build();
        let store = store_for(&project);

        let mut cycle = store.begin_diff_cycle();
        store
            .write_diff(&mut cycle, Path::new("a.txt"), "--- x\n+++ y\n")
            .await
            .unwrap();
        let folder = cycle.folder().unwrap().to_path_buf();
        assert!(folder.exists());

        store.abort_diff_cycle(cycle).await.unwrap();
        assert!(!folder.exists());
        assert!(store.list_cycles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abort_unstarted_cycle_is_noop() {
        let project = TestProject::new().build();
        let store = store_for(&project);
        store.abort_diff_cycle(store.begin_diff_cycle()).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_diff_rejects_escaping_paths() {
        let project = TestProject::new().build();
        let store = store_for(&project);
        let mut cycle = store.begin_diff_cycle();

        for bad in ["../a.txt", "/etc/passwd", ""] {
            let err = store
                .write_diff(&mut cycle, Path::new(bad), "x")
                .await
                .unwrap_err();
            assert!(matches!(err, SnapshotError::InvalidPath(_)), "{bad}");
        }
        assert!(!cycle.is_started());
    }

    #[tokio::test]
    async fn test_baseline_label_is_project_relative() {
        let project = TestProject::new().with_file("src/a.txt", "a\n").build();
        let store = store_for(&project);
        let baseline = store.create_baseline().await.unwrap();

        assert_eq!(
            store.baseline_label(&baseline, Path::new("src/a.txt")),
            ".lochist/version/20240101_000000_000/src/a.txt"
        );
    }

    #[test]
    fn test_cycle_summary_serializes() {
        let summary = CycleSummary {
            timestamp: Timestamp::from_millis(0),
            path: PathBuf::from("/p"),
            diff_count: 3,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["timestamp"], "19700101_000000_000");
        assert_eq!(json["diff_count"], 3);
    }
}
