//! sqlbridge - HTTP-to-SQL middleware
//!
//! Accepts JSON requests over HTTP and forwards them to PostgreSQL as raw
//! queries, stored-procedure calls, bulk inserts, or multi-statement
//! transactions, returning the database's result set as JSON.

pub mod bulk;
pub mod cli;
pub mod config;
pub mod errors;
pub mod executor;
pub mod http_server;
pub mod observability;
pub mod pool;
pub mod transaction;
