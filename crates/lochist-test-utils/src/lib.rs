//! Testing utilities and fixtures for lochist.
//!
//! - **Fixtures**: temporary project trees built from a file list
//! - **Clocks**: deterministic timestamp sources for snapshot folders
//!
//! # Example Usage
//!
//! ```rust
//! use lochist_test_utils::TestProject;
//!
//! let project = TestProject::new()
//!     .with_file("a.txt", "1\n2\n3\n")
//!     .with_file("src/lib.rs", "pub fn f() {}\n")
//!     .build();
//!
//! assert!(project.path().join("src/lib.rs").exists());
//! ```

pub mod fixtures;

pub use fixtures::{content, BuiltTestProject, TestProject};
pub use lochist_util::clock::StepClock;
