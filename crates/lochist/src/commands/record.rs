//! Commands that record history.

use lochist_core::{Config, DeletionWatcher, PassOutcome, Scheduler, VersionController};
use lochist_util::SystemClock;
use std::path::Path;
use std::time::Duration;
use tracing::info;

fn controller(root: &Path, config: &Config) -> VersionController {
    VersionController::from_config(root, config, SystemClock::shared())
}

/// Run passes until Ctrl-C.
pub async fn watch(
    root: &Path,
    config: &Config,
    interval: Option<u64>,
    resume: bool,
) -> anyhow::Result<()> {
    let mut controller = controller(root, config);
    if resume && !controller.resume().await? {
        info!("No baseline to resume; creating one");
    }

    let _watcher = if config.watch_deletions() {
        Some(DeletionWatcher::start(
            root,
            config.exclude_rules(),
            controller.store().store_dir(),
            controller.deletion_signal(),
        )?)
    } else {
        None
    };

    let interval = interval
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.interval());
    let handle = Scheduler::start(controller, interval);

    tokio::signal::ctrl_c().await?;
    info!("Interrupted; finishing the current pass");
    handle.shutdown().await?;

    Ok(())
}

/// Create a new baseline.
pub async fn snapshot(root: &Path, config: &Config) -> anyhow::Result<()> {
    let baseline = controller(root, config).store().create_baseline().await?;
    println!(
        "Created baseline {} ({} files)",
        baseline.timestamp,
        baseline.file_count()
    );
    Ok(())
}

/// Resume the latest baseline (creating one if none) and run one pass.
pub async fn check(root: &Path, config: &Config) -> anyhow::Result<()> {
    let mut controller = controller(root, config);
    if !controller.resume().await? {
        println!("{}", describe(&controller.run_pass().await?, root));
    }
    println!("{}", describe(&controller.run_pass().await?, root));
    Ok(())
}

fn describe(outcome: &PassOutcome, root: &Path) -> String {
    match outcome {
        PassOutcome::BaselineCreated {
            timestamp,
            file_count,
        } => format!("Created baseline {} ({} files)", timestamp, file_count),
        PassOutcome::CycleCommitted {
            summary: None,
            failed,
            ..
        } => match failed {
            0 => "No changes".to_string(),
            n => format!("No changes recorded ({} files failed)", n),
        },
        PassOutcome::CycleCommitted {
            summary: Some(summary),
            failed,
            ..
        } => {
            let path = summary.path.strip_prefix(root).unwrap_or(&summary.path);
            let mut text = format!(
                "Recorded {} diff(s) in {}",
                summary.diff_count,
                path.display()
            );
            if *failed > 0 {
                text.push_str(&format!(" ({} files failed)", failed));
            }
            text
        }
        PassOutcome::Invalidated(reason) => {
            format!("Baseline invalidated ({}); the next pass creates a new one", reason)
        }
    }
}
