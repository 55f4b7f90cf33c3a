//! Baseline snapshots and diff history for lochist.
//!
//! A project's history is a set of full-copy baselines plus, for every later
//! detection cycle, one unified diff per changed file computed against the
//! active baseline.
//!
//! # Example
//!
//! ```rust,no_run
//! use lochist_snapshot::{ChangeDetector, ExcludeRules, FileChange, SnapshotStore};
//! use lochist_util::SystemClock;
//! use std::path::Path;
//!
//! # async fn example() -> lochist_snapshot::SnapshotResult<()> {
//! let store = SnapshotStore::new(
//!     "/path/to/project",
//!     ".lochist",
//!     ExcludeRules::with_defaults(".lochist"),
//!     SystemClock::shared(),
//! );
//!
//! let baseline = store.create_baseline().await?;
//!
//! // ... files are edited ...
//!
//! let relative = Path::new("src/main.rs");
//! let change = ChangeDetector::new(0)
//!     .detect(
//!         &baseline.copy_of(relative),
//!         &store.project_root().join(relative),
//!         &store.baseline_label(&baseline, relative),
//!         "src/main.rs",
//!     )
//!     .await?;
//!
//! if let FileChange::Modified { text, .. } = change {
//!     let mut cycle = store.begin_diff_cycle();
//!     store.write_diff(&mut cycle, relative, &text).await?;
//!     store.commit_diff_cycle(cycle);
//! }
//! # Ok(())
//! # }
//! ```

mod baseline;
mod detector;
mod error;
mod exclude;
mod history;
mod store;
pub mod walk;

pub use baseline::Baseline;
pub use detector::{ChangeDetector, FileChange};
pub use error::{SnapshotError, SnapshotResult};
pub use exclude::{ExcludeRules, DEFAULT_EXCLUDES};
pub use history::{History, Reconstruction};
pub use store::{CycleEntry, CycleSummary, DiffCycle, SnapshotStore, DIFF_DIR, VERSION_DIR};
