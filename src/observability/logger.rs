//! Structured JSON logger
//!
//! - One line per event, synchronous, no buffering
//! - Fixed leading keys (`ts`, `severity`, `event`), caller fields after
//! - INFO/WARN to stdout, ERROR to stderr

use std::io::{self, Write};

use chrono::Utc;
use serde_json::{Map, Value};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Normal operations
    Info,
    /// Recoverable issues
    Warn,
    /// Operation failures
    Error,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// Synchronous JSON-line logger
pub struct Logger;

impl Logger {
    pub fn info(event: &str, fields: &[(&str, String)]) {
        Self::emit(Severity::Info, event, fields, &mut io::stdout());
    }

    pub fn warn(event: &str, fields: &[(&str, String)]) {
        Self::emit(Severity::Warn, event, fields, &mut io::stdout());
    }

    pub fn error(event: &str, fields: &[(&str, String)]) {
        Self::emit(Severity::Error, event, fields, &mut io::stderr());
    }

    fn emit<W: Write>(severity: Severity, event: &str, fields: &[(&str, String)], writer: &mut W) {
        let mut record = Map::new();
        record.insert("ts".to_string(), Value::String(Utc::now().to_rfc3339()));
        record.insert(
            "severity".to_string(),
            Value::String(severity.as_str().to_string()),
        );
        record.insert("event".to_string(), Value::String(event.to_string()));
        for (key, value) in fields {
            record.insert(key.to_string(), Value::String(value.clone()));
        }

        // One write per event, flushed immediately
        let _ = writeln!(writer, "{}", Value::Object(record));
        let _ = writer.flush();
    }
}
