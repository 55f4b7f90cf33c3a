//! Commands that browse and restore history.

use lochist_core::Config;
use lochist_snapshot::{History, SnapshotStore};
use lochist_util::SystemClock;
use serde_json::json;
use std::path::Path;

fn store(root: &Path, config: &Config) -> SnapshotStore {
    SnapshotStore::new(
        root,
        config.store_dir(),
        config.exclude_rules(),
        SystemClock::shared(),
    )
}

/// List baselines and diff cycles.
pub async fn history(root: &Path, config: &Config, as_json: bool) -> anyhow::Result<()> {
    let store = store(root, config);
    let baselines = store.list_baselines().await?;
    let cycles = store.list_cycles().await?;

    if as_json {
        let value = json!({
            "baselines": baselines.iter().map(|b| json!({
                "timestamp": b.timestamp,
                "path": b.path,
                "file_count": b.file_count(),
            })).collect::<Vec<_>>(),
            "cycles": cycles,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Baselines:");
    if baselines.is_empty() {
        println!("  (none)");
    }
    for baseline in &baselines {
        println!("  {}  {} files", baseline.timestamp, baseline.file_count());
    }
    println!();

    println!("Diff cycles:");
    if cycles.is_empty() {
        println!("  (none)");
    }
    for cycle in &cycles {
        println!("  {}", cycle.timestamp);
        for diff in &cycle.diffs {
            println!("    {}", cycle.path.join(diff).display());
        }
    }

    Ok(())
}

/// Print reconstructed content, or the parsed diff.
pub async fn show(root: &Path, diff: &Path, print_diff: bool) -> anyhow::Result<()> {
    let history = History::new(root);
    if print_diff {
        print!("{}", history.load(diff).await?);
    } else {
        print!("{}", history.reconstruct(diff).await?.reconstructed_text());
    }
    Ok(())
}

/// Print the diff from reconstructed to current content.
pub async fn compare(root: &Path, config: &Config, diff: &Path) -> anyhow::Result<()> {
    let text = History::new(root)
        .compare_with_current(diff, config.context_lines())
        .await?;
    print!("{}", text);
    Ok(())
}

/// Write reconstructed content back.
pub async fn restore(root: &Path, diff: &Path, to: Option<&Path>) -> anyhow::Result<()> {
    let written = History::new(root).restore(diff, to).await?;
    println!("Restored {}", written.display());
    Ok(())
}
