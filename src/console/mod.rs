//! Browser-style console of a client context.
//!
//! The instrumented page and the observer view each own one. Diagnostics a
//! browser would print with `console.warn(text, ...args)` land here instead of
//! being raised: a missing marker is a warning, never an error for the caller.
//! Every message is mirrored as a `tracing` event and handed to the attached
//! sinks.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The console method a message was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Log,
    Warn,
    Error,
}

/// One console line: the text plus the extra arguments passed alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Writing component, e.g. `"span"` or `"channel"`.
    pub origin: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<serde_json::Value>,
}

impl ConsoleMessage {
    pub fn new(level: LogLevel, origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            origin: origin.into(),
            text: text.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: serde_json::Value) -> Self {
        self.args.push(arg);
        self
    }
}

pub trait ConsoleSink: Send + Sync {
    fn write(&self, message: &ConsoleMessage);
}

/// Cheap to clone; clones share their sinks.
#[derive(Clone, Default)]
pub struct Console {
    sinks: Vec<Arc<dyn ConsoleSink>>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn ConsoleSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn write(&self, message: ConsoleMessage) {
        let args = serde_json::Value::Array(message.args.clone());
        match message.level {
            LogLevel::Log => tracing::info!(origin = %message.origin, %args, "{}", message.text),
            LogLevel::Warn => tracing::warn!(origin = %message.origin, %args, "{}", message.text),
            LogLevel::Error => tracing::error!(origin = %message.origin, %args, "{}", message.text),
        }
        for sink in &self.sinks {
            sink.write(&message);
        }
    }

    /// `console.warn(text, arg)`.
    pub fn warn(&self, origin: &str, text: &str, arg: serde_json::Value) {
        self.write(ConsoleMessage::new(LogLevel::Warn, origin, text).with_arg(arg));
    }

    /// `console.error(text, arg)`.
    pub fn error(&self, origin: &str, text: &str, arg: serde_json::Value) {
        self.write(ConsoleMessage::new(LogLevel::Error, origin, text).with_arg(arg));
    }
}

/// Keeps messages in memory for inspection.
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<ConsoleMessage>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<ConsoleMessage> {
        self.lock().clone()
    }

    /// Messages written at exactly `level`.
    pub fn at_level(&self, level: LogLevel) -> Vec<ConsoleMessage> {
        self.lock()
            .iter()
            .filter(|m| m.level == level)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ConsoleMessage>> {
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConsoleSink for MemorySink {
    fn write(&self, message: &ConsoleMessage) {
        self.lock().push(message.clone());
    }
}
