//! # Error Taxonomy
//!
//! One error kind per component boundary:
//! - `Validation`: caller input missing/malformed, surfaced as 400, the
//!   database is never contacted
//! - `Connection`: pool could not be established after exhausting retries
//! - `Execution`: a statement/procedure/bulk/transaction failed at the database
//! - `Rollback`: secondary failure while unwinding a transaction; logged only,
//!   never returned over the primary error

use axum::http::StatusCode;
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors produced by the pool manager, executor, bulk loader and
/// transaction coordinator
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Caller input missing or malformed
    #[error("{0}")]
    Validation(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Connection pool could not be established
    #[error("database connection failed after {attempts} attempt(s): {message}")]
    Connection { attempts: u32, message: String },

    /// Statement failed at the database
    #[error("{message}")]
    Execution {
        message: String,
        /// SQLSTATE reported by the driver, when available
        code: Option<String>,
        /// Whether the session itself is unusable (as opposed to the SQL)
        connection_class: bool,
    },

    /// Failure while rolling back a transaction
    #[error("rollback failed: {0}")]
    Rollback(String),
}

impl BridgeError {
    /// Build a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        BridgeError::Validation(message.into())
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
            BridgeError::Connection { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::Execution { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::Rollback(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for the response body; the driver's SQLSTATE when
    /// one was reported, otherwise the error-kind code
    pub fn error_code(&self) -> String {
        match self {
            BridgeError::Validation(_) => "VALIDATION_ERROR".to_string(),
            BridgeError::Connection { .. } => "CONNECTION_ERROR".to_string(),
            BridgeError::Execution { code, .. } => code
                .clone()
                .unwrap_or_else(|| "EXECUTION_ERROR".to_string()),
            BridgeError::Rollback(_) => "ROLLBACK_ERROR".to_string(),
        }
    }

    /// Whether the failure indicates the network/session is unusable,
    /// so a reconnect is worth attempting
    pub fn is_connection_class(&self) -> bool {
        match self {
            BridgeError::Connection { .. } => true,
            BridgeError::Execution {
                connection_class, ..
            } => *connection_class,
            _ => false,
        }
    }
}

/// Classify a driver error: connection-class failures mean the session is
/// unusable; everything else is a problem with the statement itself.
pub fn is_connection_class(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Convert a driver error into an `Execution` error, preserving the
/// SQLSTATE when the database reported one
pub fn execution_error(err: &sqlx::Error) -> BridgeError {
    let code = match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.to_string()),
        _ => None,
    };
    BridgeError::Execution {
        message: err.to_string(),
        code,
        connection_class: is_connection_class(err),
    }
}
