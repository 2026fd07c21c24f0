//! Event log port - structured operational logging

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEvent {
    /// Create a new log event with a level and event name
    pub fn new(level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            level,
            event: event.into(),
            operation: None,
            subscription_id: None,
            error_message: None,
            details: None,
        }
    }

    pub fn debug(event: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, event)
    }

    pub fn info(event: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, event)
    }

    pub fn warn(event: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, event)
    }

    pub fn error(event: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, event)
    }

    /// Set the store operation that emitted this event
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set the subscription the event concerns
    pub fn with_subscription(mut self, id: impl ToString) -> Self {
        self.subscription_id = Some(id.to_string());
        self
    }

    /// Set error information
    pub fn with_error(mut self, message: impl ToString) -> Self {
        self.error_message = Some(message.to_string());
        self
    }

    /// Attach structured key/value details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Sink for structured events
///
/// Recording must never fail the caller's operation; implementations swallow
/// their own errors.
pub trait EventLog: Send + Sync {
    fn record(&self, event: LogEvent);
}

/// Event log that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventLog;

impl EventLog for NullEventLog {
    fn record(&self, _event: LogEvent) {}
}

/// Event log that keeps events in memory
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events at exactly the given level
    pub fn at_level(&self, level: LogLevel) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

impl EventLog for MemoryEventLog {
    fn record(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
