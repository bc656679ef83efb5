//! Workflow event types consumed by sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a structured log event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Upper-case label, padded by the formatter to 8 columns.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of workflow observability.
///
/// `Log` events become structured lines; `Fragment` events are raw pieces of
/// a streaming LLM response and are written verbatim so the log captures the
/// stream exactly as it arrived. `StreamEnd` closes an open fragment run
/// with a newline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Log {
        when: DateTime<Utc>,
        level: LogLevel,
        module: String,
        message: String,
    },
    Fragment {
        text: String,
    },
    StreamEnd,
}

impl Event {
    pub fn log(level: LogLevel, module: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Log {
            when: Utc::now(),
            level,
            module: module.into(),
            message: message.into(),
        }
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        Event::Fragment { text: text.into() }
    }
}
