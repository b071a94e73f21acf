//! Structured logging utilities for sparkcache
//!
//! Diagnostics only. Messages meant for the notebook user (the saved/loaded
//! announcements) go through [`crate::capture::Console`] instead.
//!
//! # Log Format Conventions
//!
//! - `service`: The component emitting the event ("sparkcache.engine", ...)
//! - `operation`: The operation being performed ("decide", "save", "load")
//! - `status`: The result status ("success", "miss", "error", "recovered")
//! - `path`: The cache directory or variable sub-path
//! - `variable`: A cleaned variable name
//!
//! # Examples
//!
//! ```rust
//! use sparkcache::logging::{operations, services, status};
//! use tracing::info;
//!
//! info!(
//!     service = services::ENGINE,
//!     operation = operations::LOAD,
//!     status = status::SUCCESS,
//!     path = "/user/me/sparkcache/app",
//!     count = 2,
//!     "loaded variables from cache"
//! );
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

use crate::config::ObservabilityConfig;

/// Formatter that prints "sparkcache" instead of the module path
struct SparkCacheFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for SparkCacheFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f")
        )?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                tracing::Level::DEBUG => "\x1b[34m",
                tracing::Level::TRACE => "\x1b[35m",
            };
            write!(
                writer,
                "{}{:5}(sparkcache)\x1b[0m: ",
                level_style,
                meta.level()
            )?;
        } else {
            write!(writer, "{:5}(sparkcache): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored
    Pretty,
    /// Plain text without colors (CI)
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse a format name, `None` when unknown
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }

    /// Read `SPARKCACHE_LOG_FORMAT`, defaulting to compact under CI
    pub fn from_env() -> Self {
        let fallback = if std::env::var("CI").is_ok() {
            Self::Compact
        } else {
            Self::Pretty
        };
        Self::from_env_or(fallback)
    }

    /// Read `SPARKCACHE_LOG_FORMAT`, using `fallback` when unset or unknown
    pub fn from_env_or(fallback: Self) -> Self {
        let configured = std::env::var("SPARKCACHE_LOG_FORMAT").unwrap_or_default();
        Self::parse(&configured).unwrap_or(fallback)
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "debug", "info", "warn")
/// - `SPARKCACHE_LOG_FORMAT`: Set format ("pretty", "compact", "json")
/// - `CI`: If set, defaults to compact format
///
/// Calling it again is a no-op, so a host that loads the extension twice
/// keeps its first subscriber.
pub fn init() {
    init_with(LogFormat::from_env(), "info");
}

/// Initialize from the `[observability]` section
///
/// `SPARKCACHE_LOG_FORMAT` and `RUST_LOG` still take precedence over the
/// configured format and level.
pub fn init_from_config(config: &ObservabilityConfig) {
    init_with(format_from_config(config), &config.log_level);
}

/// Effective log format for a configuration
pub fn format_from_config(config: &ObservabilityConfig) -> LogFormat {
    let configured = LogFormat::parse(&config.log_format).unwrap_or(LogFormat::Pretty);
    LogFormat::from_env_or(configured)
}

/// Initialize with an explicit format and a fallback level used when
/// `RUST_LOG` is not set
pub fn init_with(format: LogFormat, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init only fails when a global subscriber is already installed
    let _ = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(SparkCacheFormatter { with_ansi: true })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(SparkCacheFormatter { with_ansi: false })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false)
                    .with_writer(io::stderr)
                    .json(),
            )
            .try_init(),
    };
}

/// Component names for consistent logging
pub mod services {
    pub const ENGINE: &str = "sparkcache.engine";
    pub const STORE: &str = "sparkcache.store";
    pub const FS: &str = "sparkcache.fs";
    pub const CAPTURE: &str = "sparkcache.capture";
}

/// Operation names for consistent logging
pub mod operations {
    pub const SELECT: &str = "select";
    pub const EXISTS: &str = "exists";
    pub const DECIDE: &str = "decide";
    pub const RUN: &str = "run";
    pub const SAVE: &str = "save";
    pub const LOAD: &str = "load";
    pub const REPLAY: &str = "replay";
}

/// Status values for consistent logging
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const MISS: &str = "miss";
    pub const ERROR: &str = "error";
    pub const RECOVERED: &str = "recovered";
}
