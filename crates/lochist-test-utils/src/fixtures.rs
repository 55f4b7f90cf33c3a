//! Test fixtures for creating reproducible project trees.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary test project with configurable file structure.
///
/// Creates a temporary directory that is automatically cleaned up
/// when the built project is dropped.
///
/// # Example
///
/// ```rust
/// use lochist_test_utils::fixtures::TestProject;
///
/// let project = TestProject::new()
///     .with_file("notes/todo.txt", "buy milk\n")
///     .with_dir("empty")
///     .build();
///
/// assert!(project.path().join("notes/todo.txt").exists());
/// ```
pub struct TestProject {
    /// The temporary directory backing this project.
    temp_dir: TempDir,
    /// Files to create (path relative to root -> contents).
    files: BTreeMap<PathBuf, String>,
    /// Directories to create (paths relative to root).
    dirs: Vec<PathBuf>,
}

impl TestProject {
    /// Create a new test project builder.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            files: BTreeMap::new(),
            dirs: Vec::new(),
        }
    }

    /// Add a file to the project.
    ///
    /// The path should be relative to the project root.
    /// Parent directories are created automatically.
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.files
            .insert(path.as_ref().to_path_buf(), contents.into());
        self
    }

    /// Add an empty directory to the project.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Add a small multi-directory source tree.
    pub fn with_sample_tree(self) -> Self {
        self.with_file("a.txt", content::NUMBERS)
            .with_file("src/main.rs", content::RUST_MAIN)
            .with_file("src/util/mod.rs", content::RUST_MOD)
            .with_file("docs/notes.md", content::NOTES)
    }

    /// Add a lochist configuration file.
    pub fn with_config(self, config: &str) -> Self {
        self.with_file("lochist.json", config)
    }

    /// Build the project, creating all files and directories.
    pub fn build(self) -> BuiltTestProject {
        let root = self.temp_dir.path();

        for dir in &self.dirs {
            let full_path = root.join(dir);
            fs::create_dir_all(&full_path).unwrap_or_else(|e| {
                panic!("Failed to create directory {}: {}", full_path.display(), e)
            });
        }

        for (path, contents) in &self.files {
            let full_path = root.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).unwrap_or_else(|e| {
                    panic!(
                        "Failed to create parent directory for {}: {}",
                        full_path.display(),
                        e
                    )
                });
            }
            fs::write(&full_path, contents)
                .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
        }

        BuiltTestProject {
            temp_dir: self.temp_dir,
        }
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// A built test project with files created on disk.
///
/// The temporary directory is automatically cleaned up when this is dropped.
pub struct BuiltTestProject {
    temp_dir: TempDir,
}

impl BuiltTestProject {
    /// Get the path to the project root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Read a file from the project.
    pub fn read_file(&self, path: impl AsRef<Path>) -> String {
        let full_path = self.path().join(path.as_ref());
        fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read file {}: {}", full_path.display(), e))
    }

    /// Check if a file exists in the project.
    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.path().join(path.as_ref()).exists()
    }

    /// Write a file to the project (for modifying during tests).
    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl AsRef<str>) {
        let full_path = self.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&full_path, contents.as_ref())
            .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
    }

    /// Delete a file from the project.
    pub fn delete_file(&self, path: impl AsRef<Path>) {
        let full_path = self.path().join(path.as_ref());
        fs::remove_file(&full_path)
            .unwrap_or_else(|e| panic!("Failed to delete file {}: {}", full_path.display(), e));
    }

    /// List every file below a directory, as sorted paths relative to it.
    ///
    /// Returns an empty list if the directory does not exist.
    pub fn list_files_recursive(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let base = self.path().join(dir.as_ref());
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&base)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .filter_map(|e| e.path().strip_prefix(&base).ok().map(Path::to_path_buf))
            .collect();
        files.sort();
        files
    }

    /// List the immediate subdirectory names of a directory, sorted.
    pub fn list_dirs(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let full_path = self.path().join(dir.as_ref());
        let Ok(entries) = fs::read_dir(&full_path) else {
            return Vec::new();
        };
        let mut dirs: Vec<String> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                if entry.file_type().ok()?.is_dir() {
                    Some(entry.file_name().to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        dirs.sort();
        dirs
    }
}

/// Common test file contents.
pub mod content {
    /// Three numbered lines.
    pub const NUMBERS: &str = "1\n2\n3\n";

    /// A simple Rust main function.
    pub const RUST_MAIN: &str = r#"fn main() {
    println!("Hello, world!");
}
"#;

    /// A small Rust module.
    pub const RUST_MOD: &str = r#"pub fn add(a: i32, b: i32) -> i32 {
    a + b
}
"#;

    /// A markdown note.
    pub const NOTES: &str = "# Notes\n\n- first\n- second\n";

    /// A lochist configuration.
    pub fn lochist_config(interval_secs: u64, context_lines: usize) -> String {
        format!(
            r#"{{
    "interval_secs": {interval_secs},
    "context_lines": {context_lines}
}}"#
        )
    }
}
