//! # tierlog
//!
//! Severity-routed structured logging runtime with a crash-safe lifecycle.
//!
//! Records flow from the leveled emission facade through one router that
//! decides, per record, which destinations receive it:
//!
//! - the **main** file gets everything except the noisy ranks,
//! - the **critical** file isolates `Error` and above (duplicated into
//!   main for operational context),
//! - the **verbose** file exclusively captures `Trace` and `Debug`,
//! - the **console** mirrors every level and can never break the rest of
//!   the pipeline.
//!
//! The lifecycle manager builds this graph at most once per
//! [`LoggingRuntime`] (concurrent setup callers observe the identical
//! outcome) and tears it down idempotently, aggregating every close
//! failure.
//!
//! This crate provides:
//!
//! - [`Level`] — Ordered severity taxonomy (`Trace` through `Panic`)
//! - [`Record`] — Structured record with JSON fields and caller location
//! - [`Formatter`] / [`JsonFormatter`] — Record rendering, once per dispatch
//! - [`Sink`] — Write-destination capability (file, console, in-memory)
//! - [`RotatingFileSink`] — Append-mode file sink with size/age/backup rotation
//! - [`SeverityRouter`] — The per-record routing decision point
//! - [`Options`] — Declarative, validated configuration
//! - [`LoggingRuntime`] / [`Handle`] / [`Teardown`] — Setup-once lifecycle
//! - [`Logger`] — Leveled emission facade with field enrichment
//!
//! ## Example
//!
//! ```rust
//! use tierlog::{Level, LoggingRuntime, Options};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let runtime = LoggingRuntime::new();
//! let handle = runtime
//!     .setup(
//!         &Options::new("svc")
//!             .with_dir(dir.path())
//!             .with_level(Level::Debug)
//!             .with_critical_sink()
//!             .with_verbose_sink(),
//!     )
//!     .unwrap();
//!
//! let logger = handle.logger().with_field("component", serde_json::json!("api"));
//! logger.info("service started");  // svc.log
//! logger.debug("cache warmed");    // svc.verbose.log only
//! logger.error("backend down");    // svc.log and svc.critical.log
//!
//! handle.teardown().close().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod format;
pub mod level;
pub mod logger;
pub mod options;
pub mod record;
pub mod rotate;
pub mod router;
pub mod runtime;
pub mod sink;

// Re-export main types
pub use error::{LogError, Result};
pub use format::{Formatter, JsonFormatter};
pub use level::Level;
pub use logger::Logger;
pub use options::{Options, DEFAULT_LOG_DIR};
pub use record::{Caller, Record, RecordBuilder};
pub use rotate::{RotatingFileSink, RotationPolicy};
pub use router::{Route, SeverityRouter, Target, ROUTES};
pub use runtime::{Handle, LoggingRuntime, Teardown};
pub use sink::{ConsoleSink, MemorySink, Sink};
