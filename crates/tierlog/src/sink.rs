//! The write-destination capability surface and its simple implementations.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

/// A destination capable of receiving formatted log bytes.
///
/// Sinks are owned exclusively by the lifecycle teardown; the router only
/// borrows them for writes and never closes one. Implementations must be
/// internally write-safe for concurrent callers.
pub trait Sink: Send + Sync {
    /// Short identifier used in error attribution and diagnostics.
    fn name(&self) -> &str;

    /// Writes one rendered record.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O failure; the router decides per
    /// destination whether the failure propagates.
    fn write(&self, bytes: &[u8]) -> io::Result<()>;

    /// Flushes buffered data to durable storage, when supported.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O failure. Teardown ignores sync failures.
    fn sync(&self) -> io::Result<()> {
        Ok(())
    }

    /// Releases the destination. Called exactly once, by teardown.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O failure; teardown aggregates these.
    fn close(&self) -> io::Result<()>;
}

/// Sink writing to the process's standard error stream.
///
/// The stream belongs to the process, so `close` only flushes it.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Creates a new console sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let mut handle = io::stderr().lock();
        handle.write_all(bytes)
    }

    fn sync(&self) -> io::Result<()> {
        io::stderr().lock().flush()
    }

    fn close(&self) -> io::Result<()> {
        io::stderr().lock().flush()
    }
}

/// In-memory sink, substitutable for any file destination in tests.
///
/// Records writes into a buffer and counts lifecycle calls so tests can
/// assert routing decisions and teardown behavior. Failure injection
/// covers the write and close paths.
#[derive(Debug)]
pub struct MemorySink {
    name: String,
    buffer: Mutex<Vec<u8>>,
    close_calls: AtomicUsize,
    sync_calls: AtomicUsize,
    fail_writes: AtomicBool,
    fail_close: AtomicBool,
}

impl MemorySink {
    /// Creates a new empty sink with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffer: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
            sync_calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent write fail.
    #[must_use]
    pub fn with_write_failure(self) -> Self {
        self.fail_writes.store(true, Ordering::Relaxed);
        self
    }

    /// Makes every subsequent close fail.
    #[must_use]
    pub fn with_close_failure(self) -> Self {
        self.fail_close.store(true, Ordering::Relaxed);
        self
    }

    /// Returns everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Returns the written content split into lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Number of times `close` was invoked.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Relaxed)
    }

    /// Number of times `sync` was invoked.
    #[must_use]
    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::Relaxed)
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(io::Error::other("injected write failure"));
        }
        self.buffer.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        self.close_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_close.load(Ordering::Relaxed) {
            return Err(io::Error::other("injected close failure"));
        }
        Ok(())
    }
}
