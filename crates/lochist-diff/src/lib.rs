//! Unified-diff codec and patch reconstruction.
//!
//! This crate is the wire format for all persisted lochist history:
//! - [`render`] computes a minimal line edit script and serializes it as
//!   unified-diff text
//! - [`parse`] reads unified-diff text back into a [`DiffRecord`]
//! - [`apply`] regenerates the edited content from the original lines and a
//!   record
//!
//! File text is handled as a sequence of lines split on `\n` only; see
//! [`split_lines`] and [`join_lines`].
//!
//! # Example
//!
//! ```
//! use lochist_diff::{apply, parse, render, split_lines};
//!
//! let original = split_lines("1\n2\n3\n");
//! let edited = split_lines("1\n2\n4\n");
//!
//! let text = render("a/a.txt", "b/a.txt", &original, &edited, 1);
//! let record = parse(&text).unwrap();
//! assert_eq!(apply(&original, &record).unwrap(), edited);
//! ```

mod apply;
mod error;
mod parse;
mod record;
mod render;

pub use apply::{apply, apply_text};
pub use error::{DiffError, DiffResult};
pub use parse::parse;
pub use record::{join_lines, split_lines, DiffRecord, DiffStats, Hunk, HunkRange, LineEdit};
pub use render::render;
