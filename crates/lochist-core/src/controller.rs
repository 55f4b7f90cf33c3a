//! The version controller state machine.
//!
//! Each call to [`VersionController::run_pass`] performs one detection pass:
//! with no baseline it copies the project into a new one; otherwise it walks
//! the project, diffs every file against the baseline and stores the diffs
//! of changed files in a fresh cycle folder. A file the baseline does not
//! know about, or a deletion seen since the last pass, discards the cycle
//! and schedules a new baseline.

use crate::config::Config;
use crate::error::CoreResult;
use futures::future::{BoxFuture, FutureExt};
use lochist_snapshot::walk::{entry_kind, EntryKind};
use lochist_snapshot::{
    Baseline, ChangeDetector, CycleSummary, DiffCycle, FileChange, SnapshotStore,
};
use lochist_util::path::to_slash;
use lochist_util::{SharedClock, Timestamp};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn, Instrument};

/// "A file was deleted" flag shared with the watcher.
#[derive(Debug, Clone, Default)]
pub struct DeletionSignal(Arc<AtomicBool>);

impl DeletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deletion. Safe to call from any thread.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Read and clear the flag.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Controller state between and during passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    /// The next pass creates a baseline.
    NoBaseline,
    /// Passes diff against this baseline.
    BaselineActive(Baseline),
    /// A walk is running.
    CycleInProgress,
    /// A structural change was seen; resets to `NoBaseline` immediately.
    Invalidated,
}

impl ControllerState {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerState::NoBaseline => "no-baseline",
            ControllerState::BaselineActive(_) => "baseline-active",
            ControllerState::CycleInProgress => "cycle-in-progress",
            ControllerState::Invalidated => "invalidated",
        }
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        match self {
            ControllerState::BaselineActive(baseline) => Some(baseline),
            _ => None,
        }
    }
}

/// Why a cycle was discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationReason {
    /// A file absent from the baseline.
    NewFile(PathBuf),
    /// The watcher reported a deletion.
    ExternalDeletion,
    /// A baseline file the walk never reached.
    MissingFile(PathBuf),
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationReason::NewFile(path) => write!(f, "new file {}", path.display()),
            InvalidationReason::ExternalDeletion => write!(f, "file deleted"),
            InvalidationReason::MissingFile(path) => {
                write!(f, "missing file {}", path.display())
            }
        }
    }
}

/// What one pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// A new baseline was copied.
    BaselineCreated {
        timestamp: Timestamp,
        file_count: usize,
    },
    /// The walk finished. `summary` is `None` when nothing changed.
    CycleCommitted {
        summary: Option<CycleSummary>,
        written: usize,
        failed: usize,
    },
    /// The cycle was discarded; the next pass creates a baseline.
    Invalidated(InvalidationReason),
}

enum WalkStep {
    Continue,
    Abort(InvalidationReason),
}

/// Mutable state of one walk.
struct Walk {
    baseline: Baseline,
    cycle: DiffCycle,
    visited: BTreeSet<PathBuf>,
    written: usize,
    failed: usize,
}

/// Drives baselines and diff cycles for one project.
pub struct VersionController {
    store: SnapshotStore,
    detector: ChangeDetector,
    state: ControllerState,
    deletions: DeletionSignal,
    detect_missing_files: bool,
}

impl VersionController {
    pub fn new(store: SnapshotStore, detector: ChangeDetector) -> Self {
        Self {
            store,
            detector,
            state: ControllerState::NoBaseline,
            deletions: DeletionSignal::new(),
            detect_missing_files: true,
        }
    }

    /// Build a controller for `project_root` from configuration.
    pub fn from_config(project_root: impl Into<PathBuf>, config: &Config, clock: SharedClock) -> Self {
        let store = SnapshotStore::new(
            project_root,
            config.store_dir(),
            config.exclude_rules(),
            clock,
        );
        Self::new(store, ChangeDetector::new(config.context_lines()))
            .with_missing_file_detection(config.detect_missing_files())
    }

    /// Treat baseline files that vanished as a structural change.
    pub fn with_missing_file_detection(mut self, enabled: bool) -> Self {
        self.detect_missing_files = enabled;
        self
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// A handle to the deletion flag, for the watcher.
    pub fn deletion_signal(&self) -> DeletionSignal {
        self.deletions.clone()
    }

    /// Adopt the latest stored baseline instead of creating a new one.
    ///
    /// Returns `false` when there is none; the next pass then creates one.
    pub async fn resume(&mut self) -> CoreResult<bool> {
        match self.store.latest_baseline().await? {
            Some(baseline) => {
                info!(
                    "Resuming baseline {} ({} files)",
                    baseline.timestamp,
                    baseline.file_count()
                );
                self.transition(ControllerState::BaselineActive(baseline));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run one detection pass.
    pub async fn run_pass(&mut self) -> CoreResult<PassOutcome> {
        let span = lochist_util::pass_span!(self.store.project_root());
        self.run_pass_inner().instrument(span).await
    }

    async fn run_pass_inner(&mut self) -> CoreResult<PassOutcome> {
        let baseline = match &self.state {
            ControllerState::BaselineActive(baseline) => baseline.clone(),
            ControllerState::NoBaseline => return self.create_baseline().await,
            ControllerState::Invalidated | ControllerState::CycleInProgress => {
                // Only reachable if a previous pass was dropped mid-walk.
                warn!("Previous pass did not finish; creating a new baseline");
                self.transition(ControllerState::NoBaseline);
                return self.create_baseline().await;
            }
        };

        self.transition(ControllerState::CycleInProgress);

        let mut walk = Walk {
            baseline,
            cycle: self.store.begin_diff_cycle(),
            visited: BTreeSet::new(),
            written: 0,
            failed: 0,
        };

        let step = if self.deletions.take() {
            Ok(WalkStep::Abort(InvalidationReason::ExternalDeletion))
        } else {
            match self.walk_dir(&mut walk, PathBuf::new()).await {
                Ok(WalkStep::Continue) => Ok(self.check_missing(&walk)),
                other => other,
            }
        };

        match step {
            Ok(WalkStep::Continue) => {
                let summary = self.store.commit_diff_cycle(walk.cycle);
                let outcome = PassOutcome::CycleCommitted {
                    summary,
                    written: walk.written,
                    failed: walk.failed,
                };
                self.transition(ControllerState::BaselineActive(walk.baseline));
                Ok(outcome)
            }
            Ok(WalkStep::Abort(reason)) => {
                if let Err(e) = self.store.abort_diff_cycle(walk.cycle).await {
                    warn!("Failed to discard diff cycle: {}", e);
                }
                info!("Baseline {} invalidated: {}", walk.baseline.timestamp, reason);
                self.transition(ControllerState::Invalidated);
                self.transition(ControllerState::NoBaseline);
                Ok(PassOutcome::Invalidated(reason))
            }
            Err(e) => {
                if let Err(abort) = self.store.abort_diff_cycle(walk.cycle).await {
                    warn!("Failed to discard diff cycle: {}", abort);
                }
                self.transition(ControllerState::BaselineActive(walk.baseline));
                Err(e)
            }
        }
    }

    async fn create_baseline(&mut self) -> CoreResult<PassOutcome> {
        // Deletions before the copy are part of the new baseline.
        self.deletions.take();
        let baseline = self.store.create_baseline().await?;
        let outcome = PassOutcome::BaselineCreated {
            timestamp: baseline.timestamp.clone(),
            file_count: baseline.file_count(),
        };
        self.transition(ControllerState::BaselineActive(baseline));
        Ok(outcome)
    }

    fn transition(&mut self, next: ControllerState) {
        debug!("{} -> {}", self.state.name(), next.name());
        self.state = next;
    }

    /// Visit every entry below `relative_dir`, stopping at the first
    /// structural change.
    fn walk_dir<'a>(
        &'a self,
        walk: &'a mut Walk,
        relative_dir: PathBuf,
    ) -> BoxFuture<'a, CoreResult<WalkStep>> {
        async move {
            let dir = self.store.project_root().join(&relative_dir);
            let mut entries = fs::read_dir(&dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                if let Some(pattern) = self.store.rules().matching_pattern(&name.to_string_lossy()) {
                    debug!("Skipping {:?} (matches {})", entry.path(), pattern);
                    continue;
                }

                let relative = relative_dir.join(&name);
                let step = match entry_kind(&entry).await? {
                    EntryKind::Dir => self.walk_dir(walk, relative).await?,
                    EntryKind::File => self.visit_file(walk, relative).await,
                    EntryKind::Other => WalkStep::Continue,
                };
                if let WalkStep::Abort(reason) = step {
                    return Ok(WalkStep::Abort(reason));
                }
            }

            Ok(WalkStep::Continue)
        }
        .boxed()
    }

    /// Diff one file. IO and diff failures only skip this file.
    async fn visit_file(&self, walk: &mut Walk, relative: PathBuf) -> WalkStep {
        if self.deletions.take() {
            return WalkStep::Abort(InvalidationReason::ExternalDeletion);
        }
        if !walk.baseline.contains(&relative) {
            return WalkStep::Abort(InvalidationReason::NewFile(relative));
        }
        walk.visited.insert(relative.clone());

        let change = self
            .detector
            .detect(
                &walk.baseline.copy_of(&relative),
                &self.store.project_root().join(&relative),
                &self.store.baseline_label(&walk.baseline, &relative),
                &to_slash(&relative),
            )
            .await;

        match change {
            Ok(FileChange::Unchanged) => {}
            Ok(FileChange::Modified { record, text }) => {
                match self.store.write_diff(&mut walk.cycle, &relative, &text).await {
                    Ok(path) => {
                        let stats = record.stats();
                        debug!(
                            "Wrote {:?} (+{} -{})",
                            path, stats.added, stats.removed
                        );
                        walk.written += 1;
                    }
                    Err(e) => {
                        warn!("Failed to write diff for {:?}: {}", relative, e);
                        walk.failed += 1;
                    }
                }
            }
            Ok(FileChange::Added) => {
                warn!("Baseline copy of {:?} is missing", relative);
                walk.failed += 1;
            }
            Err(e) => {
                warn!("Failed to diff {:?}: {}", relative, e);
                walk.failed += 1;
            }
        }

        WalkStep::Continue
    }

    /// A baseline file the walk did not reach has been removed.
    fn check_missing(&self, walk: &Walk) -> WalkStep {
        if !self.detect_missing_files {
            return WalkStep::Continue;
        }
        let rules = self.store.rules();
        match walk
            .baseline
            .files
            .iter()
            .find(|file| !walk.visited.contains(*file) && !rules.is_excluded(file))
        {
            Some(file) => WalkStep::Abort(InvalidationReason::MissingFile(file.clone())),
            None => WalkStep::Continue,
        }
    }

    pub fn project_root(&self) -> &Path {
        self.store.project_root()
    }
}
