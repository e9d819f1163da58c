//! Log severity levels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered log severity: `Debug < Info < Warn < Error < Panic < Fatal`.
///
/// Parsing is lenient: unknown strings fall back to [`Level::Info`] so a
/// typo in configuration never silences a sink.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Level {
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Unexpected but recoverable.
    Warn,
    /// Operation failed.
    Error,
    /// Unrecoverable in the current request.
    Panic,
    /// Unrecoverable for the process.
    Fatal,
}

impl Level {
    /// Parse a level name case-insensitively, defaulting to `Info`.
    ///
    /// # Examples
    /// ```
    /// use member_service::observability::Level;
    ///
    /// assert_eq!(Level::parse_lenient("WARN"), Level::Warn);
    /// assert_eq!(Level::parse_lenient("verbose"), Level::Info);
    /// ```
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            "panic" => Self::Panic,
            "fatal" => Self::Fatal,
            _ => Self::Info,
        }
    }

    /// Lower-case level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Panic => "panic",
            Self::Fatal => "fatal",
        }
    }
}

impl From<String> for Level {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
