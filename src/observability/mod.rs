//! Observability
//!
//! Structured logging for connection lifecycle, request failures and
//! transaction unwinding. One log line = one event.

pub mod logger;

pub use logger::{Logger, Severity};
