//! Rendering of records to bytes.

use crate::error::Result;
use crate::record::Record;

/// Renders a record to its on-wire byte form.
///
/// The router invokes the formatter exactly once per dispatched record;
/// every destination receives the same rendered bytes.
pub trait Formatter: Send + Sync {
    /// Renders the record, including any trailing delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LogError::Format`] if the record cannot be rendered.
    /// A formatting failure loses only the affected record.
    fn format(&self, record: &Record) -> Result<Vec<u8>>;
}

/// JSON-lines formatter: one JSON object per record, newline terminated.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Creates a new JSON-lines formatter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(record)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
