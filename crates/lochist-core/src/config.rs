//! Configuration management for lochist.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/lochist/config.json`
//! 2. Environment variable: `LOCHIST_CONFIG_CONTENT`
//! 3. Project config: `lochist.jsonc` or `lochist.json` in the project root
//!
//! Files are JSONC (JSON with comments). Every field is optional; unset
//! fields fall back to the defaults below.

use crate::error::{ConfigError, CoreResult};
use lochist_snapshot::ExcludeRules;
use lochist_util::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Environment variable holding inline config content.
pub const CONFIG_ENV_VAR: &str = "LOCHIST_CONFIG_CONTENT";

pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_CONTEXT_LINES: usize = 0;
pub const DEFAULT_STORE_DIR: &str = ".lochist";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON Schema reference.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Seconds between the end of one detection pass and the start of the next.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,

    /// Unchanged lines written around each change in stored diffs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_lines: Option<usize>,

    /// Name of the history directory under the project root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<String>,

    /// Name patterns excluded from history. Replaces the defaults when set;
    /// the store directory is always excluded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    /// Treat baseline files that disappeared as a structural change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detect_missing_files: Option<bool>,

    /// Watch the project for deletions while running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_deletions: Option<bool>,

    /// Log level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Loading order (later sources override earlier):
    /// 1. Global config from `~/.config/lochist/`
    /// 2. `LOCHIST_CONFIG_CONTENT` environment variable
    /// 3. Project config from `project_dir`
    ///
    /// Returns the merged config and the files it was read from.
    pub async fn load(project_dir: Option<&Path>) -> CoreResult<(Self, Vec<PathBuf>)> {
        let global_dir = Self::global_config_dir();
        let env_content = std::env::var(CONFIG_ENV_VAR).ok();
        Self::load_from(global_dir.as_deref(), env_content.as_deref(), project_dir).await
    }

    async fn load_from(
        global_dir: Option<&Path>,
        env_content: Option<&str>,
        project_dir: Option<&Path>,
    ) -> CoreResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        // 1. Load global config
        if let Some(global_dir) = global_dir {
            for name in &["config.json", "config.jsonc"] {
                let path = global_dir.join(name);
                if path.exists() {
                    let loaded = Self::load_file(&path).await?;
                    config = config.merge(loaded);
                    sources.push(path);
                    break;
                }
            }
        }

        // 2. Load from environment variable
        if let Some(content) = env_content {
            let loaded = Self::parse_jsonc(content, "<env>")?;
            config = config.merge(loaded);
        }

        // 3. Load project config
        if let Some(dir) = project_dir {
            for name in &["lochist.jsonc", "lochist.json"] {
                let path = dir.join(name);
                if path.exists() {
                    let loaded = Self::load_file(&path).await?;
                    config = config.merge(loaded);
                    sources.push(path);
                    break;
                }
            }
        }

        config.validate()?;
        Ok((config, sources))
    }

    /// Get the global config directory.
    ///
    /// On Unix systems, prefers `~/.config/lochist` over the
    /// platform-specific directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            if let Some(home) = dirs::home_dir() {
                let xdg_config = home.join(".config").join("lochist");
                if xdg_config.exists() {
                    return Some(xdg_config);
                }
            }
        }

        lochist_util::path::config_dir()
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    /// Parse JSONC (JSON with comments).
    fn parse_jsonc(content: &str, source: &str) -> CoreResult<Self> {
        let stripped = Self::strip_comments(content);

        serde_json::from_str(&stripped).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Strip `//` and `/* */` comments outside of strings.
    fn strip_comments(input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        let mut in_string = false;
        let mut escape_next = false;

        while let Some(c) = chars.next() {
            if escape_next {
                result.push(c);
                escape_next = false;
                continue;
            }

            if c == '\\' && in_string {
                result.push(c);
                escape_next = true;
                continue;
            }

            if c == '"' {
                in_string = !in_string;
                result.push(c);
                continue;
            }

            if in_string {
                result.push(c);
                continue;
            }

            if c == '/' {
                match chars.peek() {
                    Some('/') => {
                        chars.next();
                        for c in chars.by_ref() {
                            if c == '\n' {
                                result.push('\n');
                                break;
                            }
                        }
                        continue;
                    }
                    Some('*') => {
                        chars.next();
                        let mut prev = ' ';
                        for c in chars.by_ref() {
                            if prev == '*' && c == '/' {
                                break;
                            }
                            // Keep line numbers stable for error messages
                            if c == '\n' {
                                result.push('\n');
                            }
                            prev = c;
                        }
                        continue;
                    }
                    _ => {}
                }
            }

            result.push(c);
        }

        result
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.interval_secs.is_some() {
            self.interval_secs = other.interval_secs;
        }
        if other.context_lines.is_some() {
            self.context_lines = other.context_lines;
        }
        if other.store_dir.is_some() {
            self.store_dir = other.store_dir;
        }
        if other.exclude.is_some() {
            self.exclude = other.exclude;
        }
        if other.detect_missing_files.is_some() {
            self.detect_missing_files = other.detect_missing_files;
        }
        if other.watch_deletions.is_some() {
            self.watch_deletions = other.watch_deletions;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        self
    }

    /// Check values that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == Some(0) {
            return Err(ConfigError::validation("interval_secs must be at least 1"));
        }

        if let Some(store_dir) = &self.store_dir {
            let mut components = Path::new(store_dir).components();
            let single_name = matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            );
            if !single_name {
                return Err(ConfigError::validation(format!(
                    "store_dir must be a plain directory name, got {:?}",
                    store_dir
                )));
            }
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn context_lines(&self) -> usize {
        self.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES)
    }

    pub fn store_dir(&self) -> &str {
        self.store_dir.as_deref().unwrap_or(DEFAULT_STORE_DIR)
    }

    /// Exclusion rules for the configured store directory and patterns.
    pub fn exclude_rules(&self) -> ExcludeRules {
        match &self.exclude {
            Some(patterns) => ExcludeRules::new(self.store_dir(), patterns.iter().cloned()),
            None => ExcludeRules::with_defaults(self.store_dir()),
        }
    }

    pub fn detect_missing_files(&self) -> bool {
        self.detect_missing_files.unwrap_or(true)
    }

    pub fn watch_deletions(&self) -> bool {
        self.watch_deletions.unwrap_or(true)
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_default()
    }

    /// A copy with every field filled in, for display.
    pub fn resolved(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            interval_secs: Some(self.interval().as_secs()),
            context_lines: Some(self.context_lines()),
            store_dir: Some(self.store_dir().to_string()),
            exclude: Some(self.exclude_rules().patterns().to_vec()),
            detect_missing_files: Some(self.detect_missing_files()),
            watch_deletions: Some(self.watch_deletions()),
            log_level: Some(self.log_level()),
        }
    }
}
