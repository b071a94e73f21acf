use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::logging::LogFormat;

/// Complete sparkcache configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SparkCacheConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub filesystem: FilesystemConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Cache directory and invocation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default cache directory, used when an invocation gives no `--cachedir`
    #[serde(default)]
    pub dir: Option<String>,

    /// Session name used when the host does not provide one
    #[serde(default)]
    pub session_name: Option<String>,

    /// Announce saved/loaded variables
    #[serde(default = "default_true")]
    pub verbose: bool,

    /// What to do when the cell itself fails
    #[serde(default)]
    pub on_cell_error: CellErrorPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            session_name: None,
            verbose: true,
            on_cell_error: CellErrorPolicy::default(),
        }
    }
}

/// Behavior when the cell raises during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CellErrorPolicy {
    /// Replay captured output, then return the cell's error to the caller
    #[default]
    Propagate,
    /// Replay captured output and return normally, as an interactive shell does
    Report,
}

/// Filesystem backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemConfig {
    #[serde(default)]
    pub backend: FsBackend,

    /// Hadoop client binary (name on PATH or absolute path)
    #[serde(default = "default_hadoop_bin")]
    pub hadoop_bin: String,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            backend: FsBackend::default(),
            hadoop_bin: default_hadoop_bin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FsBackend {
    /// HDFS when a client is available, local disk otherwise
    #[default]
    Auto,
    Hdfs,
    Local,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_hadoop_bin() -> String {
    "hadoop".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl SparkCacheConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: SparkCacheConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Example configuration with every option spelled out
    pub fn example() -> String {
        r#"# sparkcache configuration

[cache]
# Default cache directory. Without it, <home>/sparkcache/<session-name>/ is used.
# dir = "/user/analyst/sparkcache/shared"
# session_name = "exploration"
verbose = true
# propagate: return the cell's error to the caller
# report: show the captured output and return normally
on_cell_error = "propagate"

[filesystem]
# auto | hdfs | local
backend = "auto"
hadoop_bin = "hadoop"

[observability]
log_level = "info"
log_format = "pretty"
"#
        .to_string()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.cache.dir {
            if dir.trim().is_empty() {
                anyhow::bail!("cache.dir must not be empty when set");
            }
            if !Path::new(dir).is_absolute() {
                anyhow::bail!("cache.dir must be an absolute path, got: {}", dir);
            }
        }

        if self.filesystem.hadoop_bin.trim().is_empty() {
            anyhow::bail!("filesystem.hadoop_bin must not be empty");
        }

        match self.observability.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                other
            ),
        }

        if LogFormat::parse(&self.observability.log_format).is_none() {
            anyhow::bail!(
                "Invalid log format: {}. Must be one of: pretty, compact, json",
                self.observability.log_format
            );
        }

        Ok(())
    }
}
