//! Exclusion rules shared by baseline copying, walking and watching.

use lochist_util::wildcard;
use std::path::{Component, Path};

/// Names skipped in addition to the store directory.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".gitignore", ".idea", "compare"];

/// Name patterns excluded from history.
///
/// Each pattern is matched against every component of a relative path, so an
/// excluded directory hides everything below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeRules {
    patterns: Vec<String>,
}

impl ExcludeRules {
    /// Rules made of `patterns` plus the store directory itself.
    pub fn new<I, S>(store_dir: &str, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = vec![store_dir.to_string()];
        for pattern in patterns {
            let pattern = pattern.into();
            if !pattern.is_empty() && !all.contains(&pattern) {
                all.push(pattern);
            }
        }
        Self { patterns: all }
    }

    /// The store directory plus [`DEFAULT_EXCLUDES`].
    pub fn with_defaults(store_dir: &str) -> Self {
        Self::new(store_dir, DEFAULT_EXCLUDES.iter().copied())
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// The pattern excluding a single file or directory name, if any.
    pub fn matching_pattern(&self, name: &str) -> Option<&str> {
        wildcard::find_matching_pattern(&self.patterns, name)
    }

    pub fn is_excluded_name(&self, name: &str) -> bool {
        self.matching_pattern(name).is_some()
    }

    /// Whether any component of a project-relative path is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            Component::Normal(name) => self.is_excluded_name(&name.to_string_lossy()),
            _ => false,
        })
    }
}
