//! Declarative configuration for the logging runtime.

use std::path::PathBuf;

use crate::error::{LogError, Result};
use crate::level::Level;

/// Directory used when none is configured.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// File extension for every log file.
const LOG_EXT: &str = "log";

/// Configuration consumed once by setup, before any resource is created.
///
/// Numeric limits are unsigned, so the non-negativity invariant holds by
/// construction. Zero disables the corresponding rotation rule.
#[derive(Debug, Clone)]
pub struct Options {
    /// Base name for log files; must be non-empty.
    pub name: String,
    /// Log directory; defaults to [`DEFAULT_LOG_DIR`] when unset.
    pub dir: Option<PathBuf>,
    /// Minimum level the emission facade lets through.
    pub level: Level,
    /// Maximum active-file size in megabytes before rotation.
    pub max_size_mb: u64,
    /// Rotated backups older than this many days are pruned.
    pub max_age_days: u64,
    /// Number of rotated backups to keep.
    pub max_backups: usize,
    /// Whether to create the critical isolation destination.
    pub critical_sink: bool,
    /// Whether to create the verbose destination.
    pub verbose_sink: bool,
    /// Whether to mirror every record to the console.
    pub console_sink: bool,
    /// Whether records carry their emission call site.
    pub report_caller: bool,
    /// Prefix trimmed off captured caller paths; empty keeps them whole.
    pub caller_path_prefix: String,
}

impl Options {
    /// Creates options with the given base name and defaults otherwise.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir: None,
            level: Level::Info,
            max_size_mb: 100,
            max_age_days: 0,
            max_backups: 0,
            critical_sink: false,
            verbose_sink: false,
            console_sink: false,
            report_caller: false,
            caller_path_prefix: String::new(),
        }
    }

    /// Sets the log directory.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Sets the minimum emission level.
    #[must_use]
    pub const fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the rotation size limit in megabytes.
    #[must_use]
    pub const fn with_max_size_mb(mut self, megabytes: u64) -> Self {
        self.max_size_mb = megabytes;
        self
    }

    /// Sets the backup age limit in days.
    #[must_use]
    pub const fn with_max_age_days(mut self, days: u64) -> Self {
        self.max_age_days = days;
        self
    }

    /// Sets the number of backups to keep.
    #[must_use]
    pub const fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    /// Enables the critical isolation destination.
    #[must_use]
    pub const fn with_critical_sink(mut self) -> Self {
        self.critical_sink = true;
        self
    }

    /// Enables the verbose destination.
    #[must_use]
    pub const fn with_verbose_sink(mut self) -> Self {
        self.verbose_sink = true;
        self
    }

    /// Enables the console mirror.
    #[must_use]
    pub const fn with_console_sink(mut self) -> Self {
        self.console_sink = true;
        self
    }

    /// Enables caller capture, trimming the given prefix off file paths.
    #[must_use]
    pub fn with_caller_reporting(mut self, path_prefix: impl Into<String>) -> Self {
        self.report_caller = true;
        self.caller_path_prefix = path_prefix.into();
        self
    }

    /// Checks the options without creating any resource.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidOptions`] if the name is empty or the
    /// resolved directory exists but is not a directory.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LogError::InvalidOptions {
                reason: "name must not be empty".to_string(),
            });
        }

        let dir = self.resolved_dir();
        if dir.exists() && !dir.is_dir() {
            return Err(LogError::InvalidOptions {
                reason: format!("log path '{}' exists and is not a directory", dir.display()),
            });
        }

        Ok(())
    }

    /// The directory log files live in, after defaulting.
    #[must_use]
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    /// Path of the main log file: `<dir>/<name>.log`.
    #[must_use]
    pub fn main_file(&self) -> PathBuf {
        self.file_path(None)
    }

    /// Path of the critical log file: `<dir>/<name>.critical.log`.
    #[must_use]
    pub fn critical_file(&self) -> PathBuf {
        self.file_path(Some("critical"))
    }

    /// Path of the verbose log file: `<dir>/<name>.verbose.log`.
    #[must_use]
    pub fn verbose_file(&self) -> PathBuf {
        self.file_path(Some("verbose"))
    }

    fn file_path(&self, qualifier: Option<&str>) -> PathBuf {
        let file_name = match qualifier {
            Some(qualifier) => format!("{}.{qualifier}.{LOG_EXT}", self.name),
            None => format!("{}.{LOG_EXT}", self.name),
        };
        self.resolved_dir().join(file_name)
    }
}
