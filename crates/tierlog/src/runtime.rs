//! Process-lifecycle management: setup-once construction and idempotent
//! teardown of the sink/router graph.

use std::fmt;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;

use crate::error::{LogError, Result};
use crate::format::JsonFormatter;
use crate::logger::Logger;
use crate::options::Options;
use crate::rotate::{RotatingFileSink, RotationPolicy};
use crate::router::SeverityRouter;
use crate::sink::{ConsoleSink, Sink};

/// The logger/teardown pair a successful setup hands out.
///
/// Cloning shares the underlying graph; every setup caller observes the
/// same pair.
#[derive(Clone)]
pub struct Handle {
    logger: Arc<Logger>,
    teardown: Arc<Teardown>,
}

impl Handle {
    /// The emission facade registered with the router.
    #[must_use]
    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// The owner of every created sink.
    #[must_use]
    pub fn teardown(&self) -> &Arc<Teardown> {
        &self.teardown
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("closed", &self.teardown.is_closed())
            .finish_non_exhaustive()
    }
}

/// Sole owner and releaser of the constructed sinks.
pub struct Teardown {
    router: Arc<SeverityRouter>,
    sinks: Vec<Arc<dyn Sink>>,
    closed: AtomicBool,
}

impl Teardown {
    /// Releases every owned sink.
    ///
    /// The first caller disables the router, waits out in-flight
    /// dispatches, then syncs and closes each sink; later callers return
    /// `Ok(())` immediately. Sync failures are not fatal to teardown;
    /// every sink receives its close attempt and all close failures are
    /// aggregated.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Teardown`] carrying each failed sink's close
    /// error.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // No new write may start once teardown begins.
        self.router.close();

        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(err) = sink.sync() {
                tracing::debug!(sink = sink.name(), error = %err, "sync before close failed");
            }
            if let Err(err) = sink.close() {
                failures.push((sink.name().to_string(), err));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LogError::Teardown { failures })
        }
    }

    /// Whether teardown has already run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Owner of the process-wide logging state.
///
/// Carries its own once-guard instead of hiding behind package globals,
/// so a composition root decides its scope and each test can hold an
/// independent runtime.
#[derive(Default)]
pub struct LoggingRuntime {
    outcome: OnceCell<std::result::Result<Handle, Arc<LogError>>>,
}

impl LoggingRuntime {
    /// Creates a runtime with no cached setup outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the sink/router graph from the options, at most once.
    ///
    /// The initialization body runs for the first caller only; its
    /// outcome (handle or error) is cached and replayed verbatim to
    /// every other caller, even ones supplying corrected options.
    /// Concurrent callers block on the in-flight initialization and
    /// observe the identical handle.
    ///
    /// # Errors
    ///
    /// Returns the first call's [`LogError`]: invalid options, or an I/O
    /// failure while creating the directory or a sink. The error is
    /// shared because every caller observes the same outcome.
    pub fn setup(&self, options: &Options) -> std::result::Result<Handle, Arc<LogError>> {
        self.outcome
            .get_or_init(|| Self::build(options).map_err(Arc::new))
            .clone()
    }

    fn build(options: &Options) -> Result<Handle> {
        options.validate()?;

        let dir = options.resolved_dir();
        fs::create_dir_all(&dir)?;

        let mut created: Vec<Arc<dyn Sink>> = Vec::new();
        match Self::construct(options, &mut created) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                // A partial graph must not leak open handles.
                discard(&created);
                Err(err)
            }
        }
    }

    fn construct(options: &Options, created: &mut Vec<Arc<dyn Sink>>) -> Result<Handle> {
        let policy = RotationPolicy::default()
            .with_max_size_mb(options.max_size_mb)
            .with_max_backups(options.max_backups)
            .with_max_age_days(options.max_age_days);

        let main = open_file_sink("main", options.main_file(), policy, created)?;
        let critical = options
            .critical_sink
            .then(|| open_file_sink("critical", options.critical_file(), policy, created))
            .transpose()?;
        let verbose = options
            .verbose_sink
            .then(|| open_file_sink("verbose", options.verbose_file(), policy, created))
            .transpose()?;
        let console = options.console_sink.then(|| {
            let sink: Arc<dyn Sink> = Arc::new(ConsoleSink::new());
            created.push(Arc::clone(&sink));
            sink
        });

        let mut router =
            SeverityRouter::new(Box::new(JsonFormatter::new())).with_main(main);
        if let Some(sink) = critical {
            router = router.with_critical(sink);
        }
        if let Some(sink) = verbose {
            router = router.with_verbose(sink);
        }
        if let Some(sink) = console {
            router = router.with_console(sink);
        }
        let router = Arc::new(router);

        let mut logger = Logger::new(Arc::clone(&router), options.level);
        if options.report_caller {
            logger = logger.with_caller_capture(options.caller_path_prefix.clone());
        }
        let logger = Arc::new(logger);

        let teardown = Arc::new(Teardown {
            router,
            sinks: created.clone(),
            closed: AtomicBool::new(false),
        });

        // A fatal emission flushes and closes the sinks before the
        // process terminates.
        {
            let teardown = Arc::clone(&teardown);
            logger.register_exit_hook(move || {
                if let Err(err) = teardown.close() {
                    tracing::warn!(error = %err, "teardown on fatal exit failed");
                }
            });
        }

        Ok(Handle { logger, teardown })
    }
}

fn open_file_sink(
    name: &str,
    path: std::path::PathBuf,
    policy: RotationPolicy,
    created: &mut Vec<Arc<dyn Sink>>,
) -> Result<Arc<dyn Sink>> {
    let sink = RotatingFileSink::open(name, path, policy)?;
    let sink: Arc<dyn Sink> = Arc::new(sink);
    created.push(Arc::clone(&sink));
    Ok(sink)
}

/// Closes partially constructed sinks after a failed initialization.
fn discard(sinks: &[Arc<dyn Sink>]) {
    for sink in sinks {
        if let Err(err) = sink.close() {
            tracing::debug!(
                sink = sink.name(),
                error = %err,
                "closing partially initialized sink failed"
            );
        }
    }
}
