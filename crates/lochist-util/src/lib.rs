//! Shared utilities for lochist.
//!
//! This crate provides common utilities used across the lochist workspace:
//! - Logging setup with tracing
//! - Fixed-width, sortable timestamps for snapshot folders
//! - Wildcard pattern matching for exclusion rules
//! - Path utilities

pub mod clock;
pub mod log;
pub mod path;
pub mod wildcard;

pub use clock::{Clock, SharedClock, StepClock, SystemClock, Timestamp};
pub use log::{LogConfig, LogLevel};
