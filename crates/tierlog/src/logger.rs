//! Leveled emission facade feeding the router.
//!
//! The facade builds records, captures call sites when configured, and
//! never returns errors to emission call sites; dispatch failures surface
//! through diagnostics only. Derived loggers share the router and the
//! exit hooks while carrying their own base fields, which is how callers
//! attach a component tag once instead of per record.

use std::collections::HashMap;
use std::panic::Location;
use std::process;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::level::Level;
use crate::record::{Caller, Record};
use crate::router::SeverityRouter;

type ExitHook = Box<dyn FnOnce() + Send>;

/// Builds records from leveled calls and feeds the registered router.
#[derive(Clone)]
pub struct Logger {
    router: Arc<SeverityRouter>,
    min_level: Level,
    capture_caller: bool,
    caller_trim: String,
    base_fields: HashMap<String, serde_json::Value>,
    exit_hooks: Arc<Mutex<Vec<ExitHook>>>,
}

impl Logger {
    /// Creates a logger emitting records at `min_level` and above.
    #[must_use]
    pub fn new(router: Arc<SeverityRouter>, min_level: Level) -> Self {
        Self {
            router,
            min_level,
            capture_caller: false,
            caller_trim: String::new(),
            base_fields: HashMap::new(),
            exit_hooks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Enables call-site capture, trimming `path_prefix` off file paths.
    #[must_use]
    pub fn with_caller_capture(mut self, path_prefix: impl Into<String>) -> Self {
        self.capture_caller = true;
        self.caller_trim = path_prefix.into();
        self
    }

    /// Returns a derived logger carrying an extra base field.
    ///
    /// The derived logger shares the router and exit hooks; only the
    /// base fields differ.
    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut derived = self.clone();
        derived.base_fields.insert(key.into(), value);
        derived
    }

    /// Returns a derived logger carrying the given base fields.
    #[must_use]
    pub fn with_fields(
        &self,
        fields: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Self {
        let mut derived = self.clone();
        derived.base_fields.extend(fields);
        derived
    }

    /// Registers a hook to run before the process exits on a fatal record.
    ///
    /// Hooks run at most once each, in registration order. The lifecycle
    /// manager registers teardown here so a fatal emission flushes and
    /// closes every sink before termination.
    pub fn register_exit_hook(&self, hook: impl FnOnce() + Send + 'static) {
        self.exit_hooks.lock().push(Box::new(hook));
    }

    /// Emits a record at the given level.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.emit(level, message.into(), Location::caller());
    }

    /// Emits a trace record.
    #[track_caller]
    pub fn trace(&self, message: impl Into<String>) {
        self.emit(Level::Trace, message.into(), Location::caller());
    }

    /// Emits a debug record.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.emit(Level::Debug, message.into(), Location::caller());
    }

    /// Emits an info record.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.emit(Level::Info, message.into(), Location::caller());
    }

    /// Emits a warn record.
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Level::Warn, message.into(), Location::caller());
    }

    /// Emits an error record.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.emit(Level::Error, message.into(), Location::caller());
    }

    /// Emits a fatal record, runs the exit hooks, and ends the process.
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) -> ! {
        self.emit(Level::Fatal, message.into(), Location::caller());
        self.run_exit_hooks();
        process::exit(1);
    }

    fn emit(&self, level: Level, message: String, location: &Location<'_>) {
        if !level.is_at_least(self.min_level) {
            return;
        }
        if !self.router.subscribed_levels().contains(&level) {
            return;
        }

        let mut builder = Record::builder().level(level).message(message);
        if !self.base_fields.is_empty() {
            builder = builder.fields(self.base_fields.clone());
        }
        if self.capture_caller {
            builder = builder.caller(Caller {
                file: self.trim_file(location.file()).to_string(),
                line: location.line(),
            });
        }

        match builder.build() {
            Ok(record) => {
                if let Err(err) = self.router.dispatch(&record) {
                    tracing::warn!(error = %err, "log dispatch failed");
                }
            }
            Err(err) => tracing::warn!(error = %err, "record construction failed"),
        }
    }

    fn trim_file<'a>(&self, file: &'a str) -> &'a str {
        if self.caller_trim.is_empty() {
            return file;
        }
        file.strip_prefix(self.caller_trim.as_str()).unwrap_or(file)
    }

    /// Drains and runs every registered exit hook.
    ///
    /// Invoked by [`Logger::fatal`] before the process terminates.
    pub(crate) fn run_exit_hooks(&self) {
        let hooks: Vec<ExitHook> = std::mem::take(&mut *self.exit_hooks.lock());
        for hook in hooks {
            hook();
        }
    }
}
