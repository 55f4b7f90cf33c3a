//! Command handlers for the lochist CLI.

pub mod history;
pub mod record;

pub use history::*;
pub use record::*;
