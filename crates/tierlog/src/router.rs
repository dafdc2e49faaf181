//! Per-record severity routing across the configured destinations.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{LogError, Result};
use crate::format::Formatter;
use crate::level::Level;
use crate::record::Record;
use crate::sink::Sink;

/// Destination slot addressed by a routing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Console destination; receives every level, failures never propagate.
    Console,
    /// Isolation destination for `Error` and above.
    Critical,
    /// Exclusive destination for the noisy ranks.
    Verbose,
    /// Primary destination.
    Main,
}

/// One row of the severity routing table.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    /// Least severe level this row applies to.
    pub min: Level,
    /// Most severe level this row applies to.
    pub max: Level,
    /// The destination slot written when the row applies.
    pub target: Target,
    /// When true and the row applies, dispatch stops after this write.
    pub terminal: bool,
}

impl Route {
    /// Whether this row applies to the given level.
    #[must_use]
    pub fn applies_to(&self, level: Level) -> bool {
        self.min <= level && level <= self.max
    }
}

/// The severity routing table, evaluated top to bottom for every record.
///
/// A row is skipped when its destination slot is not wired. The verbose
/// row is the single terminal rule: once taken, the noisy record never
/// reaches the main destination. The main row spans all levels so that,
/// without a verbose destination, noisy records fall through to it, and
/// `Error` and above land in both the critical and main destinations.
pub const ROUTES: &[Route] = &[
    Route {
        min: Level::Trace,
        max: Level::Panic,
        target: Target::Console,
        terminal: false,
    },
    Route {
        min: Level::Error,
        max: Level::Panic,
        target: Target::Critical,
        terminal: false,
    },
    Route {
        min: Level::Trace,
        max: Level::Debug,
        target: Target::Verbose,
        terminal: true,
    },
    Route {
        min: Level::Trace,
        max: Level::Panic,
        target: Target::Main,
        terminal: false,
    },
];

/// Routes each record to the destination set its severity selects.
///
/// Holds shared, non-owning references to its sinks; the lifecycle
/// teardown alone releases them. The open flag is guarded by a
/// read-write lock so that once [`SeverityRouter::close`] begins, no new
/// dispatch starts writing, while in-flight dispatches finish first.
pub struct SeverityRouter {
    formatter: Box<dyn Formatter>,
    console: Option<Arc<dyn Sink>>,
    main: Option<Arc<dyn Sink>>,
    critical: Option<Arc<dyn Sink>>,
    verbose: Option<Arc<dyn Sink>>,
    open: RwLock<bool>,
}

impl SeverityRouter {
    /// Creates a router with no destinations wired.
    #[must_use]
    pub fn new(formatter: Box<dyn Formatter>) -> Self {
        Self {
            formatter,
            console: None,
            main: None,
            critical: None,
            verbose: None,
            open: RwLock::new(true),
        }
    }

    /// Wires the console destination.
    #[must_use]
    pub fn with_console(mut self, sink: Arc<dyn Sink>) -> Self {
        self.console = Some(sink);
        self
    }

    /// Wires the main destination.
    #[must_use]
    pub fn with_main(mut self, sink: Arc<dyn Sink>) -> Self {
        self.main = Some(sink);
        self
    }

    /// Wires the critical destination.
    #[must_use]
    pub fn with_critical(mut self, sink: Arc<dyn Sink>) -> Self {
        self.critical = Some(sink);
        self
    }

    /// Wires the verbose destination.
    #[must_use]
    pub fn with_verbose(mut self, sink: Arc<dyn Sink>) -> Self {
        self.verbose = Some(sink);
        self
    }

    /// The levels this router wants to see: all of them.
    ///
    /// Filtering is internal to [`SeverityRouter::dispatch`]; the routing
    /// table stays legible as data instead of being spread across
    /// subscription calls.
    #[must_use]
    pub fn subscribed_levels(&self) -> &'static [Level] {
        Level::ALL
    }

    /// Whether the router still accepts records.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    /// Routes one record to every destination its severity selects.
    ///
    /// A closed router accepts and discards the record. The record is
    /// rendered once; a render failure loses exactly that record and no
    /// destination is written. Console write failures surface only as
    /// diagnostics. A critical write failure becomes the candidate return
    /// error without stopping the main write. The verbose row is terminal.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the attempted non-console writes,
    /// as [`LogError::Sink`], or [`LogError::Format`] when rendering fails.
    pub fn dispatch(&self, record: &Record) -> Result<()> {
        let open = self.open.read();
        if !*open {
            return Ok(());
        }

        let bytes = self.formatter.format(record)?;

        let mut first_error: Option<LogError> = None;
        for route in ROUTES {
            if !route.applies_to(record.level) {
                continue;
            }
            let Some(sink) = self.slot(route.target) else {
                continue;
            };

            if let Err(err) = sink.write(&bytes) {
                if route.target == Target::Console {
                    tracing::warn!(
                        sink = sink.name(),
                        error = %err,
                        "console write failed"
                    );
                } else if first_error.is_none() {
                    first_error = Some(LogError::Sink {
                        name: sink.name().to_string(),
                        source: err,
                    });
                }
            }

            if route.terminal {
                break;
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Marks the router closed.
    ///
    /// Waits for in-flight dispatches, then flips the flag. Idempotent and
    /// infallible: nothing is released here, sinks belong to teardown.
    pub fn close(&self) {
        *self.open.write() = false;
    }

    fn slot(&self, target: Target) -> Option<&Arc<dyn Sink>> {
        match target {
            Target::Console => self.console.as_ref(),
            Target::Critical => self.critical.as_ref(),
            Target::Verbose => self.verbose.as_ref(),
            Target::Main => self.main.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::JsonFormatter;
    use crate::sink::MemorySink;
    use test_case::test_case;

    struct FailingFormatter;

    impl Formatter for FailingFormatter {
        fn format(&self, _record: &Record) -> Result<Vec<u8>> {
            // Force a representative serde failure.
            let err = serde_json::from_str::<serde_json::Value>("not json")
                .expect_err("must fail");
            Err(LogError::Format(err))
        }
    }

    fn record(level: Level, message: &str) -> Record {
        Record::builder()
            .level(level)
            .message(message)
            .build()
            .expect("build record")
    }

    struct Fixture {
        router: SeverityRouter,
        main: Arc<MemorySink>,
        critical: Arc<MemorySink>,
        verbose: Arc<MemorySink>,
    }

    /// Router with main, critical, and verbose destinations wired.
    fn full_fixture() -> Fixture {
        let main = Arc::new(MemorySink::new("main"));
        let critical = Arc::new(MemorySink::new("critical"));
        let verbose = Arc::new(MemorySink::new("verbose"));
        let router = SeverityRouter::new(Box::new(JsonFormatter::new()))
            .with_main(Arc::clone(&main) as Arc<dyn Sink>)
            .with_critical(Arc::clone(&critical) as Arc<dyn Sink>)
            .with_verbose(Arc::clone(&verbose) as Arc<dyn Sink>);
        Fixture {
            router,
            main,
            critical,
            verbose,
        }
    }

    // ===========================================
    // Routing table
    // ===========================================

    #[test_case(Level::Trace, false, false, true; "trace goes to verbose only")]
    #[test_case(Level::Debug, false, false, true; "debug goes to verbose only")]
    #[test_case(Level::Info, true, false, false; "info goes to main only")]
    #[test_case(Level::Warn, true, false, false; "warn goes to main only")]
    #[test_case(Level::Error, true, true, false; "error goes to main and critical")]
    #[test_case(Level::Fatal, true, true, false; "fatal goes to main and critical")]
    #[test_case(Level::Panic, true, true, false; "panic goes to main and critical")]
    fn routing_matrix(level: Level, in_main: bool, in_critical: bool, in_verbose: bool) {
        let fx = full_fixture();
        fx.router.dispatch(&record(level, "probe")).expect("dispatch");

        assert_eq!(!fx.main.contents().is_empty(), in_main, "main");
        assert_eq!(!fx.critical.contents().is_empty(), in_critical, "critical");
        assert_eq!(!fx.verbose.contents().is_empty(), in_verbose, "verbose");
    }

    #[test]
    fn routing_is_independent_of_call_history() {
        let fx = full_fixture();
        for level in [Level::Debug, Level::Error, Level::Info, Level::Debug] {
            fx.router.dispatch(&record(level, "again")).expect("dispatch");
        }

        assert_eq!(fx.main.lines().len(), 2, "info + error");
        assert_eq!(fx.critical.lines().len(), 1, "error only");
        assert_eq!(fx.verbose.lines().len(), 2, "both debug records");
    }

    #[test]
    fn noisy_levels_fall_through_to_main_without_verbose_sink() {
        let main = Arc::new(MemorySink::new("main"));
        let router = SeverityRouter::new(Box::new(JsonFormatter::new()))
            .with_main(Arc::clone(&main) as Arc<dyn Sink>);

        router.dispatch(&record(Level::Debug, "noisy")).expect("dispatch");
        router.dispatch(&record(Level::Trace, "noisier")).expect("dispatch");

        assert_eq!(main.lines().len(), 2);
    }

    #[test]
    fn console_receives_every_level() {
        let console = Arc::new(MemorySink::new("console"));
        let main = Arc::new(MemorySink::new("main"));
        let router = SeverityRouter::new(Box::new(JsonFormatter::new()))
            .with_console(Arc::clone(&console) as Arc<dyn Sink>)
            .with_main(Arc::clone(&main) as Arc<dyn Sink>);

        for level in Level::ALL {
            router.dispatch(&record(*level, "echo")).expect("dispatch");
        }

        assert_eq!(console.lines().len(), Level::ALL.len());
    }

    #[test]
    fn info_error_and_debug_land_in_their_sinks() {
        let fx = full_fixture();

        fx.router.dispatch(&record(Level::Info, "a")).expect("dispatch");
        fx.router.dispatch(&record(Level::Error, "b")).expect("dispatch");
        fx.router.dispatch(&record(Level::Debug, "c")).expect("dispatch");

        let main = fx.main.contents();
        let critical = fx.critical.contents();
        let verbose = fx.verbose.contents();

        assert!(main.contains("\"a\"") && main.contains("\"b\"") && !main.contains("\"c\""));
        assert!(critical.contains("\"b\"") && !critical.contains("\"a\""));
        assert!(verbose.contains("\"c\"") && !verbose.contains("\"a\""));
    }

    // ===========================================
    // Failure isolation
    // ===========================================

    #[test]
    fn console_failure_never_propagates() {
        let console = Arc::new(MemorySink::new("console").with_write_failure());
        let main = Arc::new(MemorySink::new("main"));
        let router = SeverityRouter::new(Box::new(JsonFormatter::new()))
            .with_console(console as Arc<dyn Sink>)
            .with_main(Arc::clone(&main) as Arc<dyn Sink>);

        router.dispatch(&record(Level::Info, "kept")).expect("dispatch");
        assert_eq!(main.lines().len(), 1);
    }

    #[test]
    fn critical_failure_does_not_block_main() {
        let critical = Arc::new(MemorySink::new("critical").with_write_failure());
        let main = Arc::new(MemorySink::new("main"));
        let router = SeverityRouter::new(Box::new(JsonFormatter::new()))
            .with_critical(critical as Arc<dyn Sink>)
            .with_main(Arc::clone(&main) as Arc<dyn Sink>);

        let err = router
            .dispatch(&record(Level::Error, "boom"))
            .expect_err("critical failure surfaces");

        // The duplicate main write still happened.
        assert_eq!(main.lines().len(), 1);
        assert!(matches!(err, LogError::Sink { ref name, .. } if name == "critical"));
    }

    #[test]
    fn verbose_failure_does_not_fall_through_to_main() {
        let verbose = Arc::new(MemorySink::new("verbose").with_write_failure());
        let main = Arc::new(MemorySink::new("main"));
        let router = SeverityRouter::new(Box::new(JsonFormatter::new()))
            .with_verbose(verbose as Arc<dyn Sink>)
            .with_main(Arc::clone(&main) as Arc<dyn Sink>);

        let err = router
            .dispatch(&record(Level::Debug, "noisy"))
            .expect_err("verbose failure surfaces");

        assert!(main.contents().is_empty());
        assert!(matches!(err, LogError::Sink { ref name, .. } if name == "verbose"));
    }

    #[test]
    fn format_failure_writes_nothing_and_leaves_router_usable() {
        let main = Arc::new(MemorySink::new("main"));
        let router = SeverityRouter::new(Box::new(FailingFormatter))
            .with_main(Arc::clone(&main) as Arc<dyn Sink>);

        let err = router
            .dispatch(&record(Level::Info, "lost"))
            .expect_err("format failure surfaces");
        assert!(matches!(err, LogError::Format(_)));
        assert!(main.contents().is_empty());
        assert!(router.is_open());
    }

    // ===========================================
    // Close semantics
    // ===========================================

    #[test]
    fn dispatch_after_close_is_a_quiet_no_op() {
        let fx = full_fixture();
        fx.router.close();

        fx.router.dispatch(&record(Level::Error, "late")).expect("no error");
        assert!(fx.main.contents().is_empty());
        assert!(fx.critical.contents().is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let fx = full_fixture();
        fx.router.close();
        fx.router.close();
        assert!(!fx.router.is_open());
    }

    #[test]
    fn close_races_with_inflight_dispatches() {
        use std::thread;

        let fx = full_fixture();
        let router = Arc::new(fx.router);
        let main = fx.main;

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let router = Arc::clone(&router);
                thread::spawn(move || {
                    for _ in 0..50 {
                        router
                            .dispatch(&record(Level::Info, "race"))
                            .expect("dispatch never errors here");
                    }
                })
            })
            .collect();

        let closer = {
            let router = Arc::clone(&router);
            thread::spawn(move || router.close())
        };

        for writer in writers {
            writer.join().expect("join writer");
        }
        closer.join().expect("join closer");

        assert!(!router.is_open());
        // Whatever was written before the flag flipped is complete lines.
        for line in main.lines() {
            let value: serde_json::Value =
                serde_json::from_str(&line).expect("complete JSON line");
            assert_eq!(value["message"], "race");
        }
    }

    #[test]
    fn subscribed_levels_cover_the_full_set() {
        let fx = full_fixture();
        assert_eq!(fx.router.subscribed_levels(), Level::ALL);
    }

    // ===========================================
    // Properties
    // ===========================================

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn any_level() -> impl Strategy<Value = Level> {
            prop::sample::select(Level::ALL.to_vec())
        }

        proptest! {
            /// With a verbose destination wired, no noisy record ever
            /// reaches the main destination, whatever the call sequence.
            #[test]
            fn noisy_records_never_reach_main(
                levels in prop::collection::vec(any_level(), 1..64)
            ) {
                let fx = full_fixture();
                for (i, level) in levels.iter().enumerate() {
                    fx.router
                        .dispatch(&record(*level, &format!("m{i}")))
                        .expect("dispatch");
                }

                let main = fx.main.contents();
                for (i, level) in levels.iter().enumerate() {
                    let token = format!("\"m{i}\"");
                    if level.is_verbose() {
                        prop_assert!(!main.contains(&token));
                    } else {
                        prop_assert!(main.contains(&token));
                    }
                }
            }
        }
    }
}
