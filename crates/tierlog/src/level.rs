//! Severity taxonomy for log records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// Log severity levels, ordered from most to least verbose.
///
/// The total order is fixed: `Panic` is the most severe rank and `Trace`
/// the least. Routing decisions compare ranks with [`Level::is_at_least`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Most verbose, per-item detail.
    Trace = 0,
    /// Debugging information.
    Debug = 1,
    /// General information and lifecycle events.
    Info = 2,
    /// Recoverable issues.
    Warn = 3,
    /// Error conditions needing operator attention.
    Error = 4,
    /// Unrecoverable conditions; the emitting process is about to exit.
    Fatal = 5,
    /// Most severe rank, reserved for panic handlers.
    Panic = 6,
}

impl Level {
    /// Every level, least severe first.
    pub const ALL: &'static [Self] = &[
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
        Self::Panic,
    ];

    /// Returns true if this level is at least as severe as the given level.
    #[must_use]
    pub fn is_at_least(self, level: Self) -> bool {
        self >= level
    }

    /// Returns true for the noisy ranks (`Trace` and `Debug`) that the
    /// verbose destination captures exclusively.
    #[must_use]
    pub fn is_verbose(self) -> bool {
        self <= Self::Debug
    }

    /// Returns the string representation of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Panic => "panic",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            "panic" => Ok(Self::Panic),
            other => Err(LogError::InvalidOptions {
                reason: format!("unknown level: {other}"),
            }),
        }
    }
}
