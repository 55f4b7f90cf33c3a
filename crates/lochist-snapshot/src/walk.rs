//! Directory enumeration.

use crate::ExcludeRules;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// What a directory entry is, following symlinks to files only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Other,
}

/// Classify a directory entry. Symlinked directories are reported as
/// [`EntryKind::Other`] so walks never loop.
pub async fn entry_kind(entry: &fs::DirEntry) -> io::Result<EntryKind> {
    let file_type = entry.file_type().await?;
    if file_type.is_dir() {
        return Ok(EntryKind::Dir);
    }
    if file_type.is_file() {
        return Ok(EntryKind::File);
    }
    if file_type.is_symlink() {
        if let Ok(metadata) = fs::metadata(entry.path()).await {
            if metadata.is_file() {
                return Ok(EntryKind::File);
            }
        }
    }
    Ok(EntryKind::Other)
}

/// Every file below `root`, as paths relative to it.
///
/// With `rules`, excluded names are skipped along with everything below them.
/// Symlinked files are listed; symlinked directories are not entered.
pub async fn list_files(root: &Path, rules: Option<&ExcludeRules>) -> io::Result<BTreeSet<PathBuf>> {
    let walker = walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !rules.is_some_and(|r| r.is_excluded_name(&name))
        });

    let mut files = BTreeSet::new();
    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();
        let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.insert(relative.to_path_buf());
        }
    }

    Ok(files)
}
