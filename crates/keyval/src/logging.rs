//! Logging setup for applications embedding keyval.
//!
//! The store itself only emits `tracing` events under the span configured in
//! [`KeyValConfig`](crate::KeyValConfig). This module installs a global
//! subscriber for binaries, tests and benchmarks that want to see them.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "keyval.log";
const DEFAULT_LEVEL: &str = "info";

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    /// Daily-rolled file
    File(PathBuf),
    /// Stdout plus a daily-rolled file
    Both(PathBuf),
}

/// Line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-oriented
    Pretty,
    /// One line per event
    Compact,
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub output: LogOutput,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    pub fn info() -> Self {
        Self::default()
    }

    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    pub fn warn() -> Self {
        Self::default().with_level("warn")
    }

    /// Log to a daily-rolled file at `path`
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Log to stdout and to a daily-rolled file at `path`
    pub fn with_both(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// `RUST_LOG` if set, else the configured level, else `info`
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    }

    /// Install the global subscriber.
    ///
    /// For file output the returned guard owns the background writer; keep
    /// it alive for as long as events should reach the file. Does nothing
    /// if a global subscriber is already installed.
    ///
    /// ```rust,no_run
    /// use keyval::logging::LogConfig;
    ///
    /// let _guard = LogConfig::debug().with_file("./logs/keyval.log").init();
    /// ```
    pub fn init(self) -> Option<WorkerGuard> {
        let filter = self.filter();
        let registry = tracing_subscriber::registry().with(filter);

        match self.output {
            LogOutput::Stdout => {
                let _ = match self.format {
                    LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
                    LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                };
                None
            }
            LogOutput::File(path) => {
                let (writer, guard) = file_writer(&path);
                let layer = fmt::layer().with_writer(writer).with_ansi(false);
                let _ = match self.format {
                    LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
                    LogFormat::Compact => registry.with(layer.compact()).try_init(),
                };
                Some(guard)
            }
            LogOutput::Both(path) => {
                let (writer, guard) = file_writer(&path);
                let _ = registry
                    .with(fmt::layer().compact())
                    .with(fmt::layer().with_writer(writer).with_ansi(false).compact())
                    .try_init();
                Some(guard)
            }
        }
    }
}

fn file_writer(path: &Path) -> (NonBlocking, WorkerGuard) {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name))
}
