//! Connection Lifecycle Manager
//!
//! Owns the single shared connection pool:
//! - establishes it with bounded retries and linear-scaled backoff
//! - lazily re-establishes it on demand if absent
//! - replaces it wholesale on reconnect (old handle closed first)
//! - offers a health probe that never raises

pub mod manager;

pub use manager::{HealthStatus, PoolManager, DEFAULT_CONNECT_ATTEMPTS};
