//! File system watcher raising the deletion signal.

use crate::controller::DeletionSignal;
use crate::error::CoreResult;
use lochist_snapshot::ExcludeRules;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Watches a project tree and raises a [`DeletionSignal`] when a tracked
/// file or directory is removed.
///
/// Events inside the store directory or under excluded names are ignored.
/// Dropping the watcher stops it.
pub struct DeletionWatcher {
    _watcher: RecommendedWatcher,
}

impl DeletionWatcher {
    pub fn start(
        root: &Path,
        rules: ExcludeRules,
        store_dir: PathBuf,
        signal: DeletionSignal,
    ) -> CoreResult<Self> {
        let watched_root = root.to_path_buf();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_tracked_removal(&event, &watched_root, &store_dir, &rules) {
                    debug!("Deletion observed: {:?}", event.paths);
                    signal.raise();
                }
            }
            Err(e) => warn!("Watch error: {}", e),
        })?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        info!("Watching {:?} for deletions", root);

        Ok(Self { _watcher: watcher })
    }
}

/// Whether `event` removes something history tracks.
pub fn is_tracked_removal(
    event: &Event,
    root: &Path,
    store_dir: &Path,
    rules: &ExcludeRules,
) -> bool {
    if !matches!(event.kind, EventKind::Remove(_)) {
        return false;
    }

    event.paths.iter().any(|path| {
        if path.starts_with(store_dir) {
            return false;
        }
        match path.strip_prefix(root) {
            Ok(relative) => !relative.as_os_str().is_empty() && !rules.is_excluded(relative),
            Err(_) => false,
        }
    })
}
