//! The log record value consumed by the routing engine.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LogError;
use crate::level::Level;

/// Source location of the emission call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Source file path, possibly with a configured prefix trimmed off.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A structured log record.
///
/// Immutable once built; created by the emission facade and consumed
/// exactly once by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// When the record was created.
    pub timestamp: DateTime<Utc>,
    /// Severity level.
    pub level: Level,
    /// The log message.
    pub message: String,
    /// Additional structured fields; insertion order is irrelevant.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, serde_json::Value>,
    /// Call site, captured only when caller reporting is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<Caller>,
}

impl Record {
    /// Creates a new record builder.
    #[must_use]
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }
}

/// Builder for constructing log records.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    timestamp: Option<DateTime<Utc>>,
    level: Option<Level>,
    message: Option<String>,
    fields: HashMap<String, serde_json::Value>,
    caller: Option<Caller>,
}

impl RecordBuilder {
    /// Sets the timestamp. Defaults to the current time when unset.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the severity level.
    #[must_use]
    pub const fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a structured field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Merges a map of structured fields.
    #[must_use]
    pub fn fields(mut self, fields: HashMap<String, serde_json::Value>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Sets the call site.
    #[must_use]
    pub fn caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Builds the record.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::MissingField`] if level or message is not set.
    pub fn build(self) -> Result<Record, LogError> {
        let level = self.level.ok_or(LogError::MissingField("level"))?;
        let message = self.message.ok_or(LogError::MissingField("message"))?;

        Ok(Record {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            level,
            message,
            fields: self.fields,
            caller: self.caller,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_level_and_message() {
        let result = Record::builder().message("no level").build();
        assert!(matches!(result, Err(LogError::MissingField("level"))));

        let result = Record::builder().level(Level::Info).build();
        assert!(matches!(result, Err(LogError::MissingField("message"))));
    }

    #[test]
    fn builder_defaults_timestamp_to_now() {
        let before = Utc::now();
        let record = Record::builder()
            .level(Level::Info)
            .message("tick")
            .build()
            .expect("build");
        assert!(record.timestamp >= before);
        assert!(record.timestamp <= Utc::now());
    }

    #[test]
    fn builder_keeps_an_explicit_timestamp() {
        let fixed = chrono::DateTime::parse_from_rfc3339("2026-01-05T09:30:00Z")
            .expect("parse")
            .with_timezone(&Utc);
        let record = Record::builder()
            .timestamp(fixed)
            .level(Level::Info)
            .message("pinned")
            .build()
            .expect("build");
        assert_eq!(record.timestamp, fixed);
    }

    #[test]
    fn builder_collects_fields() {
        let record = Record::builder()
            .level(Level::Warn)
            .message("slow query")
            .field("duration_ms", serde_json::json!(412))
            .field("component", serde_json::json!("db"))
            .build()
            .expect("build");

        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields["component"], serde_json::json!("db"));
    }

    #[test]
    fn record_serialization_skips_empty_optionals() {
        let record = Record::builder()
            .level(Level::Info)
            .message("bare")
            .build()
            .expect("build");

        let json = serde_json::to_string(&record).expect("serialize");
        assert!(!json.contains("fields"));
        assert!(!json.contains("caller"));
    }

    #[test]
    fn record_serialization_round_trip() {
        let record = Record::builder()
            .level(Level::Error)
            .message("boom")
            .field("attempt", serde_json::json!(3))
            .caller(Caller {
                file: "api/handler.rs".to_string(),
                line: 57,
            })
            .build()
            .expect("build");

        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: Record = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, record);
    }

    #[test]
    fn caller_display() {
        let caller = Caller {
            file: "src/main.rs".to_string(),
            line: 10,
        };
        assert_eq!(caller.to_string(), "src/main.rs:10");
    }
}
