//! Structured logging for the landslide risk service
//!
//! Every event carries the data source it concerns and, where there is one,
//! the place it is about. Events go through `tracing`; `init_logger` installs
//! a `tracing-subscriber` formatter on stderr or, for scheduled runs, on an
//! append-mode log file.

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses the names accepted in the settings file.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Rainfall,
    Iem,
    Database,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Rainfall => write!(f, "RAIN"),
            DataSource::Iem => write!(f, "IEM"),
            DataSource::Database => write!(f, "DB"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides `min_level` when set. If the log file cannot be
/// opened, output falls back to stderr. Calling this twice is harmless: the
/// second subscriber is ignored.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.directive()));

    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                None
            }
        }
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let _ = match file {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: DataSource, place: Option<&str>, message: &str) {
    tracing::info!(source = %source, place = place.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: DataSource, place: Option<&str>, message: &str) {
    tracing::warn!(source = %source, place = place.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: DataSource, place: Option<&str>, message: &str) {
    tracing::error!(source = %source, place = place.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: DataSource, place: Option<&str>, message: &str) {
    tracing::debug!(source = %source, place = place.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

/// Summary line for one invocation.
pub fn run_summary_message(requested: usize, inserted: usize) -> String {
    format!("Run complete: {}/{} places recorded", inserted, requested)
}

/// Batches are all-or-nothing, so a run either records every place or none.
pub fn run_summary_level(requested: usize, inserted: usize) -> LogLevel {
    if inserted == requested {
        LogLevel::Info
    } else {
        LogLevel::Error
    }
}

/// Log the outcome of one invocation, successful or not.
pub fn log_run_summary(requested: usize, inserted: usize) {
    let message = run_summary_message(requested, inserted);
    match run_summary_level(requested, inserted) {
        LogLevel::Error => error(DataSource::System, None, &message),
        _ => info(DataSource::System, None, &message),
    }
}
