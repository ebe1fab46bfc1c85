//! Logging infrastructure.
//!
//! Console output goes to stderr so it never interleaves with the progress
//! line on stdout. The console level comes from `RUST_LOG` when set, or
//! from [`LoggingConfig::verbose`] otherwise. An optional log file receives
//! `info` and above through a non-blocking writer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Default console filter.
pub const DEFAULT_CONSOLE_LEVEL: &str = "warn";

/// Console filter with `--verbose`.
pub const VERBOSE_CONSOLE_LEVEL: &str = "debug";

/// Filter for the log file.
pub const DEFAULT_FILE_LEVEL: &str = "info";

/// Where and how much to log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log to the console at debug level.
    pub verbose: bool,
    /// Also write logs to this file (truncated at startup).
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Filter directive used when `RUST_LOG` is unset.
    pub fn console_level(&self) -> &'static str {
        if self.verbose {
            VERBOSE_CONSOLE_LEVEL
        } else {
            DEFAULT_CONSOLE_LEVEL
        }
    }
}

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the log file's directory cannot be created or the
/// file cannot be truncated.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, io::Error> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level()));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let (file_layer, file_guard) = match &config.file {
        Some(path) => {
            let (dir, name) = prepare_log_file(path)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(DEFAULT_FILE_LEVEL));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Splits a log path into the appender's directory and file name.
///
/// A bare file name logs into the current directory.
fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf), io::Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path.file_name().map(PathBuf::from).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("log path {} has no file name", path.display()),
        )
    })?;
    Ok((dir, name))
}

/// Creates the parent directory and truncates the file.
fn prepare_log_file(path: &Path) -> Result<(PathBuf, PathBuf), io::Error> {
    let (dir, name) = split_log_path(path)?;
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(&name), "")?;
    Ok((dir, name))
}
