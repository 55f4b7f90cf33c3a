//! Path utilities.
//!
//! This module provides utilities for working with file paths.

use std::path::{Component, Path, PathBuf};

/// Get the lochist configuration directory.
///
/// This follows XDG conventions on Linux/macOS:
/// - `$XDG_CONFIG_HOME/lochist` if set
/// - `~/.config/lochist` otherwise
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lochist"))
}

/// Check if a path is within a base directory.
///
/// This is used for security checks to prevent path traversal.
pub fn is_within(path: &Path, base: &Path) -> bool {
    let canonical_path = path.canonicalize().ok();
    let canonical_base = base.canonicalize().ok();

    match (canonical_path, canonical_base) {
        (Some(p), Some(b)) => p.starts_with(&b),
        // Paths that do not exist yet fall back to a lexical prefix check.
        _ => normalize(path).starts_with(normalize(base)),
    }
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => {
                result.push(component);
            }
        }
    }

    result
}

/// Join a path safely, preventing path traversal.
///
/// Returns `None` if the resulting path would be outside the base.
pub fn safe_join(base: &Path, path: &Path) -> Option<PathBuf> {
    let result = base.join(path);
    let normalized = normalize(&result);

    if is_within(&normalized, base) {
        Some(normalized)
    } else {
        None
    }
}

/// Render a relative path with `/` separators regardless of platform.
///
/// Diff headers are written with this form so stored history stays portable.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
