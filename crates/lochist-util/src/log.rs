//! Logging setup using tracing.
//!
//! All output goes to stderr so command results on stdout stay parseable.
//! The configured level applies to the lochist crates; dependencies such as
//! the file watcher backend only report warnings.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events follow the configured level.
const LOCHIST_TARGETS: &[&str] = &[
    "lochist",
    "lochist_core",
    "lochist_snapshot",
    "lochist_diff",
    "lochist_util",
];

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Include file and line of each event.
    pub include_location: bool,
}

impl LogConfig {
    /// Resolve the command-line `--verbose` flag against the configured level.
    ///
    /// Verbose runs log at debug with source locations; otherwise the
    /// configured level is used as is.
    pub fn resolve(verbose: bool, configured: LogLevel) -> Self {
        if verbose {
            Self {
                level: LogLevel::Debug,
                include_location: true,
            }
        } else {
            Self {
                level: configured,
                include_location: false,
            }
        }
    }

    /// Filter directives: warnings from everything, the configured level
    /// from lochist itself.
    pub fn directives(&self) -> String {
        let mut directives = vec!["warn".to_string()];
        directives.extend(
            LOCHIST_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, self.level.as_str())),
        );
        directives.join(",")
    }
}

/// Install the global subscriber on stderr.
///
/// `RUST_LOG` takes precedence over the configured directives. Calling this
/// again after a subscriber is installed has no effect.
pub fn init(config: LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directives()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.include_location)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Logging already initialized");
    }
}

/// Create a tracing span for one detection pass.
#[macro_export]
macro_rules! pass_span {
    ($root:expr) => {
        tracing::info_span!("pass", root = %$root.display())
    };
}
