//! Core engine for lochist.
//!
//! This crate ties the snapshot store to a running project:
//! - [`VersionController`]: the baseline / diff-cycle state machine
//! - [`Scheduler`]: periodic, non-overlapping detection passes
//! - [`DeletionWatcher`]: file system events feeding the deletion signal
//! - [`Config`]: layered JSONC configuration

pub mod config;
pub mod controller;
pub mod error;
pub mod scheduler;
pub mod watcher;

pub use config::Config;
pub use controller::{
    ControllerState, DeletionSignal, InvalidationReason, PassOutcome, VersionController,
};
pub use error::{ConfigError, CoreError, CoreResult};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use watcher::DeletionWatcher;
