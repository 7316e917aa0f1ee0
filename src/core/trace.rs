// src/core/trace.rs
//! Per-request event recording.
//!
//! One `TraceLog` is created per pipeline request and threaded through the
//! stages; events stay with the request instead of going through a
//! process-wide toggle, so concurrent requests never interleave output.

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub at: DateTime<Utc>,
    pub level: Level,
    pub stage: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct TraceLog {
    min_level: Level,
    events: Vec<Event>,
}

impl TraceLog {
    pub fn new(min_level: Level) -> Self {
        TraceLog { min_level, events: Vec::new() }
    }

    pub fn record(&mut self, level: Level, stage: &'static str, message: impl Into<String>) {
        if level < self.min_level {
            return;
        }
        self.events.push(Event { at: Utc::now(), level, stage, message: message.into() });
    }

    pub fn debug(&mut self, stage: &'static str, message: impl Into<String>) {
        self.record(Level::Debug, stage, message);
    }

    pub fn info(&mut self, stage: &'static str, message: impl Into<String>) {
        self.record(Level::Info, stage, message);
    }

    pub fn warn(&mut self, stage: &'static str, message: impl Into<String>) {
        self.record(Level::Warn, stage, message);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl Default for TraceLog {
    fn default() -> Self {
        TraceLog::new(Level::Info)
    }
}
