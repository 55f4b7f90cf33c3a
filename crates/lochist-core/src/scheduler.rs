//! Periodic detection passes.

use crate::controller::{PassOutcome, VersionController};
use crate::error::CoreResult;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs detection passes on a background task.
///
/// The next pass is scheduled only after the previous one finished, so
/// passes never overlap. Cancellation is observed between passes only.
pub struct Scheduler;

impl Scheduler {
    /// Spawn the pass loop: one pass immediately, then one pass `interval`
    /// after each previous pass completes.
    pub fn start(controller: VersionController, interval: Duration) -> SchedulerHandle {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let mut controller = controller;
            info!(
                "Watching {:?} every {}s",
                controller.project_root(),
                interval.as_secs_f64()
            );

            loop {
                match controller.run_pass().await {
                    Ok(outcome) => log_outcome(&outcome),
                    Err(e) => warn!("Detection pass failed: {}", e),
                }

                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            info!("Scheduler stopped");
            controller
        });

        SchedulerHandle { token, task }
    }
}

fn log_outcome(outcome: &PassOutcome) {
    match outcome {
        PassOutcome::BaselineCreated { .. } => {}
        PassOutcome::CycleCommitted {
            summary: None,
            failed: 0,
            ..
        } => debug!("No changes"),
        PassOutcome::CycleCommitted {
            written, failed, ..
        } => debug!("Cycle finished: {} written, {} failed", written, failed),
        PassOutcome::Invalidated(reason) => debug!("Cycle discarded: {}", reason),
    }
}

/// Control over a running [`Scheduler`].
pub struct SchedulerHandle {
    token: CancellationToken,
    task: JoinHandle<VersionController>,
}

impl SchedulerHandle {
    /// Cancel the pending timer without waiting. A pass in flight finishes.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the in-flight pass, returning the controller.
    pub async fn shutdown(self) -> CoreResult<VersionController> {
        self.token.cancel();
        Ok(self.task.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerState;
    use lochist_snapshot::{ChangeDetector, ExcludeRules, SnapshotStore};
    use lochist_test_utils::{StepClock, TestProject};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Instant;

    fn controller_at(root: &Path) -> VersionController {
        let store = SnapshotStore::new(
            root,
            ".lochist",
            ExcludeRules::with_defaults(".lochist"),
            Arc::new(StepClock::default()),
        );
        VersionController::new(store, ChangeDetector::default())
    }

    /// Poll `check` until it holds or five seconds pass.
    async fn eventually(mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check()
    }

    #[tokio::test]
    async fn test_first_pass_runs_immediately() {
        let project = TestProject::new().with_file("a.txt", "1\n").build();
        let handle = Scheduler::start(controller_at(project.path()), Duration::from_secs(3600));

        assert!(eventually(|| project.list_dirs(".lochist/version").len() == 1).await);

        let controller = handle.shutdown().await.unwrap();
        assert!(matches!(
            controller.state(),
            ControllerState::BaselineActive(_)
        ));
    }

    #[tokio::test]
    async fn test_periodic_passes_record_changes() {
        let project = TestProject::new().with_file("a.txt", "1\n").build();
        let mut controller = controller_at(project.path());
        controller.run_pass().await.unwrap();
        project.write_file("a.txt", "2\n");

        let handle = Scheduler::start(controller, Duration::from_millis(20));
        assert!(eventually(|| !project.list_dirs(".lochist/diff").is_empty()).await);
        handle.shutdown().await.unwrap();

        let cycles = project.list_dirs(".lochist/diff");
        assert!(project.file_exists(Path::new(".lochist/diff").join(&cycles[0]).join("a.txt.diff")));
    }

    #[tokio::test]
    async fn test_failed_passes_keep_scheduling() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        // A file where the project directory should be makes every pass fail.
        std::fs::write(&root, "not a directory").unwrap();

        let handle = Scheduler::start(controller_at(&root), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_stopped());

        std::fs::remove_file(&root).unwrap();
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("a.txt"), "1\n").unwrap();

        let version_dir = root.join(".lochist/version");
        assert!(
            eventually(|| std::fs::read_dir(&version_dir)
                .map(|entries| entries.count() > 0)
                .unwrap_or(false))
            .await
        );

        let controller = handle.shutdown().await.unwrap();
        assert!(controller.store().latest_baseline().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stop_does_not_wait() {
        let project = TestProject::new().with_file("a.txt", "1\n").build();
        let handle = Scheduler::start(controller_at(project.path()), Duration::from_secs(3600));

        handle.stop();
        assert!(handle.is_stopped());

        // The loop exits at its next sleep, without waiting for the interval.
        let controller = tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
        assert!(controller.state().baseline().is_some());
    }
}
