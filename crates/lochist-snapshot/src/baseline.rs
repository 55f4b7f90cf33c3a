//! Baseline handles.

use lochist_util::Timestamp;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A full-copy snapshot under `version/<timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Baseline {
    /// Creation timestamp, also the folder name.
    pub timestamp: Timestamp,
    /// Absolute path of the baseline folder.
    pub path: PathBuf,
    /// Project-relative paths of every file copied into the baseline.
    pub files: BTreeSet<PathBuf>,
}

impl Baseline {
    pub fn new(timestamp: Timestamp, path: PathBuf, files: BTreeSet<PathBuf>) -> Self {
        Self {
            timestamp,
            path,
            files,
        }
    }

    /// Whether the baseline recorded a copy of this project-relative file.
    pub fn contains(&self, relative: &Path) -> bool {
        self.files.contains(relative)
    }

    /// Location of the baseline copy of a project-relative file.
    pub fn copy_of(&self, relative: &Path) -> PathBuf {
        self.path.join(relative)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
