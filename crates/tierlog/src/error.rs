//! Error types for the logging runtime.

use thiserror::Error;

/// Errors that can occur in the logging runtime.
#[derive(Debug, Error)]
pub enum LogError {
    /// The supplied options were rejected before any resource was created.
    #[error("invalid options: {reason}")]
    InvalidOptions {
        /// The reason the options are invalid.
        reason: String,
    },

    /// A required record field was not provided.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Rendering a record to bytes failed; only that record is lost.
    #[error("format error: {0}")]
    Format(#[from] serde_json::Error),

    /// An I/O error occurred outside of any particular sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A write to a named sink failed.
    #[error("sink '{name}' write failed: {source}")]
    Sink {
        /// The sink that rejected the write.
        name: String,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// One or more sinks failed to close during teardown.
    ///
    /// Every sink still receives its close attempt; the constituent
    /// failures are all retained here.
    #[error("teardown failed for {} sink(s)", failures.len())]
    Teardown {
        /// Each failed sink's name paired with its close error.
        failures: Vec<(String, std::io::Error)>,
    },
}

/// Result type alias for logging operations.
pub type Result<T> = std::result::Result<T, LogError>;
